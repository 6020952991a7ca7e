//! Terminal front-end for notifications, the expiry prompt and navigation

use async_trait::async_trait;
use certdesk_client::session::Navigator;
use certdesk_client::{ExpiryNotice, ExpiryPrompt, Level, Notification, Notifier};
use dialoguer::Select;
use dialoguer::theme::ColorfulTheme;

/// Prints notifications to stderr
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNotifier;

impl Notifier for TerminalNotifier {
    fn notify(&self, n: Notification) {
        eprintln!("{}", render(&n));
    }
}

fn render(n: &Notification) -> String {
    let mark = match n.level {
        Level::Success => "✔",
        Level::Error => "✘",
    };
    format!("{mark} {}: {}", n.title, n.description)
}

/// Blocking "OK" prompt for an expired session
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalPrompt;

#[async_trait]
impl ExpiryPrompt for TerminalPrompt {
    async fn acknowledge(&self, notice: &ExpiryNotice) {
        let prompt = format!("{}: {}", notice.title, notice.message);
        let shown = prompt.clone();
        let answered = tokio::task::spawn_blocking(move || {
            Select::with_theme(&ColorfulTheme::default())
                .with_prompt(prompt)
                .items(&["OK"])
                .default(0)
                .interact()
        })
        .await;

        match answered {
            Ok(Ok(_)) => {}
            // Not a terminal: print the notice and carry on
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Expiry prompt unavailable");
                eprintln!("{shown}");
            }
            Err(e) => tracing::error!(error = %e, "Expiry prompt task failed"),
        }
    }
}

/// "Redirects" to login by telling the user how to log in again
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn redirect_to_login(&self) {
        eprintln!("Logged out. Run `certdesk login` to sign in again.");
    }
}
