//! Implements InputPort. Inquire-based interactive menu over the user and bill services.

use crate::adapters::export::{bills_to_csv, user_matches_to_csv};
use crate::adapters::ui::progress::spinner;
use crate::domain::{DomainError, NewUser, User};
use crate::ports::InputPort;
use crate::usecases::{BillService, UserService};
use async_trait::async_trait;
use chrono::Datelike;
use inquire::error::InquireError;
use inquire::ui::{Color, RenderConfig, Styled};
use inquire::{Confirm, CustomType, Password, Select, Text};
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;

/// Applies the prompt theme globally for all inquire prompts.
pub fn apply_theme() {
    let config = RenderConfig::default()
        .with_prompt_prefix(Styled::new("›").with_fg(Color::LightGreen))
        .with_highlighted_option_prefix(Styled::new("▸").with_fg(Color::LightYellow));
    inquire::set_global_render_config(config);
}

fn prompt_err(e: InquireError) -> DomainError {
    DomainError::Prompt(e.to_string())
}

fn is_cancel(e: &DomainError) -> bool {
    matches!(e, DomainError::Prompt(msg) if msg.contains("canceled") || msg.contains("interrupted"))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuAction {
    ImportBills,
    ListBills,
    LookupBill,
    RefreshBill,
    ExportBills,
    RegisterUser,
    ConfirmAccount,
    ResetPassword,
    SearchUsers,
    Authorize,
    Deauthorize,
    ChangeAvatar,
    ShowActivity,
    DeleteUser,
    Exit,
}

impl MenuAction {
    const ALL: [MenuAction; 15] = [
        MenuAction::ImportBills,
        MenuAction::ListBills,
        MenuAction::LookupBill,
        MenuAction::RefreshBill,
        MenuAction::ExportBills,
        MenuAction::RegisterUser,
        MenuAction::ConfirmAccount,
        MenuAction::ResetPassword,
        MenuAction::SearchUsers,
        MenuAction::Authorize,
        MenuAction::Deauthorize,
        MenuAction::ChangeAvatar,
        MenuAction::ShowActivity,
        MenuAction::DeleteUser,
        MenuAction::Exit,
    ];
}

impl fmt::Display for MenuAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MenuAction::ImportBills => "Import bills from Câmara",
            MenuAction::ListBills => "List stored bills",
            MenuAction::LookupBill => "Look up bill by Câmara id",
            MenuAction::RefreshBill => "Refresh stored bill from Câmara",
            MenuAction::ExportBills => "Export bills to CSV",
            MenuAction::RegisterUser => "Register user",
            MenuAction::ConfirmAccount => "Confirm account",
            MenuAction::ResetPassword => "Reset password",
            MenuAction::SearchUsers => "Search users",
            MenuAction::Authorize => "Authorize collaborator",
            MenuAction::Deauthorize => "Revoke collaborator",
            MenuAction::ChangeAvatar => "Change avatar",
            MenuAction::ShowActivity => "Show activity",
            MenuAction::DeleteUser => "Delete user",
            MenuAction::Exit => "Exit",
        };
        f.write_str(label)
    }
}

/// TUI adapter. Inquire prompts.
pub struct TuiInputPort {
    users: Arc<UserService>,
    bills: Arc<BillService>,
    export_dir: PathBuf,
}

impl TuiInputPort {
    pub fn new(users: Arc<UserService>, bills: Arc<BillService>, export_dir: PathBuf) -> Self {
        Self {
            users,
            bills,
            export_dir,
        }
    }

    async fn dispatch(&self, action: MenuAction) -> Result<(), DomainError> {
        match action {
            MenuAction::ImportBills => self.import_bills().await,
            MenuAction::ListBills => self.list_bills().await,
            MenuAction::LookupBill => self.lookup_bill().await,
            MenuAction::RefreshBill => self.refresh_bill().await,
            MenuAction::ExportBills => self.export_bills().await,
            MenuAction::RegisterUser => self.register_user().await,
            MenuAction::ConfirmAccount => self.confirm_account().await,
            MenuAction::ResetPassword => self.reset_password().await,
            MenuAction::SearchUsers => self.search_users().await,
            MenuAction::Authorize => self.change_role(true).await,
            MenuAction::Deauthorize => self.change_role(false).await,
            MenuAction::ChangeAvatar => self.change_avatar().await,
            MenuAction::ShowActivity => self.show_activity().await,
            MenuAction::DeleteUser => self.delete_user().await,
            MenuAction::Exit => Ok(()),
        }
    }

    async fn import_bills(&self) -> Result<(), DomainError> {
        let sigla = Text::new("Bill type (sigla):")
            .with_default("PL")
            .prompt()
            .map_err(prompt_err)?;
        let year = CustomType::<i32>::new("Year:")
            .with_default(chrono::Utc::now().year())
            .with_error_message("Enter a year, e.g. 2013")
            .prompt()
            .map_err(prompt_err)?;

        let pb = spinner(format!("Fetching {} {} from Câmara...", sigla.trim(), year));
        let result = self.bills.import(sigla.trim(), year).await;
        pb.finish_and_clear();
        let stats = result?;
        println!(
            "Fetched {}, stored {}, already known {}.",
            stats.fetched, stats.inserted, stats.skipped
        );
        Ok(())
    }

    async fn list_bills(&self) -> Result<(), DomainError> {
        let bills = self.bills.get_all().await?;
        if bills.is_empty() {
            println!("No bills stored yet.");
        }
        for bill in bills {
            println!("[{}] {}: {}", bill.camara_id, bill.name, bill.description);
        }
        Ok(())
    }

    async fn lookup_bill(&self) -> Result<(), DomainError> {
        let camara_id = CustomType::<i64>::new("Câmara id (idProposicao):")
            .with_error_message("Enter a numeric id")
            .prompt()
            .map_err(prompt_err)?;

        let pb = spinner(format!("Looking up {}...", camara_id));
        let result = self.bills.fetch_by_camara_id(camara_id).await;
        pb.finish_and_clear();
        match result? {
            Some(bill) => println!("{}\n{}", bill.name, bill.description),
            None => println!("Bill {} not found.", camara_id),
        }
        Ok(())
    }

    async fn refresh_bill(&self) -> Result<(), DomainError> {
        let camara_id = CustomType::<i64>::new("Câmara id (idProposicao):")
            .with_error_message("Enter a numeric id")
            .prompt()
            .map_err(prompt_err)?;
        let Some(id) = self
            .bills
            .get_by_camara_id(camara_id)
            .await?
            .and_then(|b| b.id)
        else {
            println!("Bill {} is not stored.", camara_id);
            return Ok(());
        };

        let pb = spinner(format!("Refreshing {}...", camara_id));
        let result = self.bills.refresh(id).await;
        pb.finish_and_clear();
        match result? {
            Some(bill) => println!("{}\n{}", bill.name, bill.description),
            None => println!("Bill {} not found in Câmara.", camara_id),
        }
        Ok(())
    }

    async fn export_bills(&self) -> Result<(), DomainError> {
        let default_path = self.export_dir.join("proposicoes.csv");
        let path = Text::new("Output file:")
            .with_default(&default_path.to_string_lossy())
            .prompt()
            .map_err(prompt_err)?;

        let bills = self.bills.get_all().await?;
        let csv = bills_to_csv(&bills).map_err(|e| DomainError::Repo(format!("CSV: {}", e)))?;
        tokio::fs::write(&path, csv)
            .await
            .map_err(|e| DomainError::Repo(format!("write {}: {}", path, e)))?;
        println!("Exported {} bills to {}", bills.len(), path);
        Ok(())
    }

    /// Prompt for an e-mail and load that user.
    async fn pick_user(&self) -> Result<Option<User>, DomainError> {
        let email = Text::new("User e-mail:").prompt().map_err(prompt_err)?;
        let user = self.users.get_by_email(email.trim()).await?;
        if user.is_none() {
            println!("No user with e-mail {}.", email.trim());
        }
        Ok(user)
    }

    async fn register_user(&self) -> Result<(), DomainError> {
        let email = Text::new("E-mail:").prompt().map_err(prompt_err)?;
        let name = Text::new("Name (optional):").prompt().map_err(prompt_err)?;
        let password = Password::new("Password:").prompt().map_err(prompt_err)?;

        let mut user = self
            .users
            .create(NewUser {
                email,
                password,
                name: Some(name).filter(|n| !n.trim().is_empty()),
            })
            .await?;
        let code = self.users.request_confirmation(&mut user).await?;

        println!("Created {} (alias {}).", user.name_or_email(), user.alias.as_deref().unwrap_or(""));
        if let Some(url) = self.users.profile_url(&user) {
            println!("Profile: {}", url);
        }
        println!("Confirmation code: {}", code);
        Ok(())
    }

    async fn confirm_account(&self) -> Result<(), DomainError> {
        let code = Text::new("Confirmation code:").prompt().map_err(prompt_err)?;
        match self.users.check_confirmation(code.trim()).await? {
            Some(user) => println!("{} is now active.", user.name_or_email()),
            None => println!("Invalid confirmation code."),
        }
        Ok(())
    }

    async fn reset_password(&self) -> Result<(), DomainError> {
        let Some(mut user) = self.pick_user().await? else {
            return Ok(());
        };
        let confirmed = Confirm::new(&format!("Reset password of {}?", user.name_or_email()))
            .with_default(false)
            .prompt()
            .map_err(prompt_err)?;
        if !confirmed {
            return Ok(());
        }
        let password = self.users.reset_password(&mut user).await?;
        println!("New password: {}", password);
        Ok(())
    }

    async fn search_users(&self) -> Result<(), DomainError> {
        let key = Text::new("Search:").prompt().map_err(prompt_err)?;
        let hits = self.users.search(key.trim()).await?;
        if hits.is_empty() {
            println!("No users found.");
            return Ok(());
        }
        let csv =
            user_matches_to_csv(&hits).map_err(|e| DomainError::Repo(format!("CSV: {}", e)))?;
        print!("{}", csv);
        Ok(())
    }

    async fn change_role(&self, promote: bool) -> Result<(), DomainError> {
        let Some(mut user) = self.pick_user().await? else {
            return Ok(());
        };
        if promote {
            self.users.authorize(&mut user).await?;
        } else {
            self.users.deauthorize(&mut user).await?;
        }
        println!("{} is now {}.", user.name_or_email(), user.role_description());
        Ok(())
    }

    async fn change_avatar(&self) -> Result<(), DomainError> {
        let Some(mut user) = self.pick_user().await? else {
            return Ok(());
        };
        let path = Text::new("Image path:").prompt().map_err(prompt_err)?;
        self.users.add_avatar(&mut user, path.trim()).await?;
        let thumb = self.users.avatar_url(&user, Some("thumb")).await?;
        println!("Avatar updated (thumbnail: {}).", thumb);
        Ok(())
    }

    async fn delete_user(&self) -> Result<(), DomainError> {
        let Some(user) = self.pick_user().await? else {
            return Ok(());
        };
        let confirmed = Confirm::new(&format!("Delete {}?", user.name_or_email()))
            .with_default(false)
            .prompt()
            .map_err(prompt_err)?;
        if confirmed {
            self.users.delete(&user).await?;
            println!("Deleted {}.", user.name_or_email());
        }
        Ok(())
    }

    async fn show_activity(&self) -> Result<(), DomainError> {
        let Some(user) = self.pick_user().await? else {
            return Ok(());
        };
        let activities = self.users.activities(&user).await?.unwrap_or_default();
        if activities.is_empty() {
            println!("No activity.");
        }
        for activity in activities {
            let when = activity
                .created_at
                .map(|t| t.to_string())
                .unwrap_or_default();
            println!("{}  {}", when, activity.kind);
        }
        Ok(())
    }
}

#[async_trait]
impl InputPort for TuiInputPort {
    async fn run(&self) -> Result<(), DomainError> {
        loop {
            let action = match Select::new("What now?", MenuAction::ALL.to_vec()).prompt() {
                Ok(action) => action,
                Err(InquireError::OperationCanceled | InquireError::OperationInterrupted) => break,
                Err(e) => return Err(prompt_err(e)),
            };
            if action == MenuAction::Exit {
                break;
            }
            if let Err(e) = self.dispatch(action).await {
                if is_cancel(&e) {
                    continue;
                }
                warn!(action = %action, error = %e, "menu action failed");
                println!("Error: {}", e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_menu_lists_every_action_once() {
        let labels: Vec<String> = MenuAction::ALL.iter().map(|a| a.to_string()).collect();
        let mut unique = labels.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), labels.len());
        assert_eq!(MenuAction::ALL.last(), Some(&MenuAction::Exit));
    }

    #[test]
    fn test_cancel_detection() {
        assert!(is_cancel(&prompt_err(InquireError::OperationCanceled)));
        assert!(!is_cancel(&DomainError::Validation("x".into())));
    }
}
