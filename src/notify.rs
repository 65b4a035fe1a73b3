//! Completion notifications: a desktop notification always, plus an optional
//! fire-and-forget ServerChan push. Neither outcome feeds back into the timer.

use notify_rust::{Notification, Urgency};

use crate::settings::Settings;

const PUSH_ENDPOINT: &str = "https://sctapi.ftqq.com";

pub struct Notifier {
    push_enabled: bool,
    secret_key: String,
    warned_missing_key: bool,
}

impl Notifier {
    pub fn new(settings: &Settings) -> Self {
        Self {
            push_enabled: settings.push_notification,
            secret_key: settings.secret_key.clone(),
            warned_missing_key: false,
        }
    }

    /// Announces one finished pomodoro. `task` is the line's text with the
    /// marker stripped, so the message names what was being worked on.
    pub fn completion(&mut self, task: &str, repeat: u32) {
        let title = "Pomodoro finished";
        let body = if task.is_empty() {
            format!("Cycle {repeat} is done. Time for a break.")
        } else {
            format!("Cycle {repeat} of \"{task}\" is done. Time for a break.")
        };

        let _ = Notification::new()
            .summary(title)
            .body(&body)
            .appname("pomark")
            .icon("alarm-clock")
            .urgency(Urgency::Critical)
            .show();

        if self.push_enabled {
            self.push(title, &body);
        }
    }

    fn push(&mut self, title: &str, body: &str) {
        if self.secret_key.is_empty() {
            if !self.warned_missing_key {
                eprintln!("pomark: push notification enabled but no secret key is configured");
                self.warned_missing_key = true;
            }
            return;
        }

        let url = format!("{PUSH_ENDPOINT}/{}.send", self.secret_key);
        let title = title.to_string();
        let body = body.to_string();
        // Fire and forget; the tick path never waits on delivery.
        std::thread::spawn(move || {
            let _ = ureq::post(&url)
                .timeout(std::time::Duration::from_secs(10))
                .send_form(&[("title", title.as_str()), ("desp", body.as_str())]);
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_key_is_warned_about_once() {
        let settings = Settings {
            push_notification: true,
            ..Settings::default()
        };
        let mut notifier = Notifier::new(&settings);
        assert!(!notifier.warned_missing_key);
        notifier.push("t", "b");
        assert!(notifier.warned_missing_key);
        // Second call is a silent skip.
        notifier.push("t", "b");
        assert!(notifier.warned_missing_key);
    }
}
