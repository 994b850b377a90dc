//! Once-per-day trigger for the auto-update loop

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerDecision {
    /// The configured cutoff has not been reached today
    BeforeCutoff,
    /// An update was already triggered on this date
    AlreadyTriggered(NaiveDate),
    /// Past the cutoff and not yet triggered today
    Due,
}

/// Remembers the last calendar day an update was triggered
#[derive(Debug, Clone, Default)]
pub struct DailyTrigger {
    last_triggered: Option<NaiveDate>,
}

impl DailyTrigger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn evaluate(&self, now: NaiveDateTime, cutoff: NaiveTime) -> TriggerDecision {
        if now.time() < cutoff {
            return TriggerDecision::BeforeCutoff;
        }
        match self.last_triggered {
            Some(day) if day == now.date() => TriggerDecision::AlreadyTriggered(day),
            _ => TriggerDecision::Due,
        }
    }

    pub fn mark(&mut self, day: NaiveDate) {
        self.last_triggered = Some(day);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(day: u32, hour: u32, minute: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, day)
            .unwrap()
            .and_hms_opt(hour, minute, 0)
            .unwrap()
    }

    fn cutoff() -> NaiveTime {
        NaiveTime::from_hms_opt(20, 0, 0).unwrap()
    }

    #[test]
    fn test_before_cutoff() {
        let trigger = DailyTrigger::new();
        assert_eq!(trigger.evaluate(at(1, 19, 59), cutoff()), TriggerDecision::BeforeCutoff);
    }

    #[test]
    fn test_due_at_exact_cutoff() {
        let trigger = DailyTrigger::new();
        assert_eq!(trigger.evaluate(at(1, 20, 0), cutoff()), TriggerDecision::Due);
    }

    #[test]
    fn test_fires_once_per_day() {
        let mut trigger = DailyTrigger::new();
        assert_eq!(trigger.evaluate(at(1, 21, 0), cutoff()), TriggerDecision::Due);
        trigger.mark(at(1, 21, 0).date());

        assert_eq!(
            trigger.evaluate(at(1, 23, 0), cutoff()),
            TriggerDecision::AlreadyTriggered(at(1, 0, 0).date())
        );
        assert_eq!(trigger.evaluate(at(2, 8, 0), cutoff()), TriggerDecision::BeforeCutoff);
        assert_eq!(trigger.evaluate(at(2, 20, 30), cutoff()), TriggerDecision::Due);
    }
}
