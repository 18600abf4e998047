use rand::Rng;

use crate::structs::{ReminderKind, ScheduleEntry};

const CHECKPOINT_TITLES: &[&str] = &[
    "💧 Evening Hydration Check",
    "🌊 How's Your Water Journey?",
    "💙 Daily Wellness Check",
];

const ADAPTIVE_TITLES: &[&str] = &[
    "💧 Gentle Reminder",
    "🌊 Hydration Moment",
    "💙 Time for Self-Care",
    "🌿 Wellness Break",
];

const GOAL_MET_BODIES: &[&str] = &[
    "How did your hydration go today? Every sip counts! 🌊",
    "Reflecting on today's water journey. You're doing great! 💙",
    "Time to celebrate your hydration wins today! ✨",
];

const MORNING_BODIES: &[&str] = &[
    "Good morning! Start your day with some refreshing water 🌅",
    "Morning hydration sets the tone for a great day! ☀️",
    "Your body is ready for some morning refreshment 💧",
];

const AFTERNOON_BODIES: &[&str] = &[
    "Afternoon energy boost: time for some water! ⚡",
    "Keep your momentum going with a hydration break 🌊",
    "Your afternoon self will thank you for this water break 💙",
];

const EVENING_BODIES: &[&str] = &[
    "Evening wind-down with some gentle hydration 🌙",
    "End your day on a healthy note with some water 🌟",
    "Evening self-care: time for hydration 💫",
];

/// Placeholder replaced with the milliliters still missing
pub const VOLUME_PLACEHOLDER: &str = "{volume}";

/// What the checkpoint body is rendered from.
#[derive(Debug, Clone, Copy)]
pub struct MessageContext<'a> {
    pub template: &'a str,
    pub remaining_ml: u32,
}

pub fn render_template(template: &str, remaining_ml: u32) -> String {
    template.replace(VOLUME_PLACEHOLDER, &remaining_ml.to_string())
}

fn pick<R: Rng>(rng: &mut R, pool: &[&'static str]) -> &'static str {
    pool[rng.random_range(0..pool.len())]
}

pub fn title<R: Rng>(rng: &mut R, kind: ReminderKind) -> String {
    let pool = match kind {
        ReminderKind::Checkpoint => CHECKPOINT_TITLES,
        ReminderKind::Adaptive => ADAPTIVE_TITLES,
    };
    pick(rng, pool).to_string()
}

pub fn body<R: Rng>(rng: &mut R, entry: &ScheduleEntry, ctx: &MessageContext<'_>) -> String {
    match entry.kind {
        ReminderKind::Checkpoint if ctx.remaining_ml == 0 => pick(rng, GOAL_MET_BODIES).to_string(),
        ReminderKind::Checkpoint => render_template(ctx.template, ctx.remaining_ml),
        ReminderKind::Adaptive => {
            let pool = match entry.hour {
                0..=11 => MORNING_BODIES,
                12..=16 => AFTERNOON_BODIES,
                _ => EVENING_BODIES,
            };
            pick(rng, pool).to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn template_substitutes_every_placeholder() {
        assert_eq!(
            render_template("{volume}ml to go, {volume}ml!", 750),
            "750ml to go, 750ml!"
        );
        assert_eq!(render_template("no placeholder", 10), "no placeholder");
    }

    #[test]
    fn checkpoint_body_uses_template_until_goal_is_met() {
        let mut rng = StdRng::seed_from_u64(7);
        let entry = ScheduleEntry::checkpoint(20);

        let behind = MessageContext {
            template: "Still {volume}ml left",
            remaining_ml: 900,
        };
        assert_eq!(body(&mut rng, &entry, &behind), "Still 900ml left");

        let done = MessageContext {
            template: "Still {volume}ml left",
            remaining_ml: 0,
        };
        assert!(GOAL_MET_BODIES.contains(&body(&mut rng, &entry, &done).as_str()));
    }

    #[test]
    fn adaptive_body_follows_time_of_day() {
        let mut rng = StdRng::seed_from_u64(7);
        let ctx = MessageContext {
            template: "",
            remaining_ml: 100,
        };

        let morning = body(&mut rng, &ScheduleEntry::adaptive(8, 5), &ctx);
        let afternoon = body(&mut rng, &ScheduleEntry::adaptive(13, 5), &ctx);
        let evening = body(&mut rng, &ScheduleEntry::adaptive(19, 5), &ctx);

        assert!(MORNING_BODIES.contains(&morning.as_str()));
        assert!(AFTERNOON_BODIES.contains(&afternoon.as_str()));
        assert!(EVENING_BODIES.contains(&evening.as_str()));
        assert!(ADAPTIVE_TITLES.contains(&title(&mut rng, ReminderKind::Adaptive).as_str()));
    }
}
