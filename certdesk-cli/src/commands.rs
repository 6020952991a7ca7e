//! Subcommand handlers

use anyhow::{Context, Result, bail};
use certdesk_client::{ApiClient, AuthApi, CertificateApi, QrImage, QueryClient};
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Password};
use shared::{Certificate, CertificateDraft, LoginRequest, SignupRequest};

use crate::cli::{Command, DraftArgs};

pub async fn run(command: Command, client: ApiClient) -> Result<()> {
    let queries = QueryClient::new(client.clone());
    let auth = AuthApi::new(queries.clone());
    let certificates = CertificateApi::new(queries);

    match command {
        Command::Login { email, password } => {
            let email = match email {
                Some(email) => email,
                None => prompt_input("Email")?,
            };
            let password = match password {
                Some(password) => password,
                None => prompt_password("Password", false)?,
            };
            let session = auth.login(&LoginRequest::new(email, password)).await?;
            println!(
                "Logged in as {}",
                session.display_name().unwrap_or_else(|| "unknown user".into())
            );
        }
        Command::Signup {
            first_name,
            last_name,
            email,
            phone,
            password,
        } => {
            let password = match password {
                Some(password) => password,
                None => prompt_password("Password", true)?,
            };
            let mut request = SignupRequest::new(first_name, last_name, email, password);
            if let Some(phone) = phone {
                request = request.with_phone_number(phone);
            }
            auth.signup(&request).await?;
        }
        Command::Logout => auth.logout(),
        Command::Whoami => {
            let session = client.context().snapshot();
            if !session.is_authenticated() {
                println!("Not logged in");
            } else {
                println!("{}", session.display_name().unwrap_or_else(|| "(no name)".into()));
                if let Some(email) = session.get("email").and_then(|v| v.as_str()) {
                    println!("{email}");
                }
            }
        }
        Command::List { page, limit, json } => {
            let list = certificates.list(page, limit).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&list.data)?);
                return Ok(());
            }
            print_table(&list.data);
            let pagination = list.pagination_or_default();
            println!(
                "page {}/{} ({} total)",
                pagination.current_page, pagination.last_page, pagination.total
            );
        }
        Command::Show { id, json } => {
            let cert = certificates.get(&id).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&cert)?);
            } else {
                print_details(&cert);
            }
        }
        Command::Create(args) => {
            let draft = apply(CertificateDraft::default(), &args);
            for (value, flag) in [
                (&draft.certificate_number, "--number"),
                (&draft.standard, "--standard"),
                (&draft.organization, "--organization"),
            ] {
                if value.is_empty() {
                    bail!("{flag} is required");
                }
            }
            let qr = read_qr(&args).await?;
            certificates.create(&draft, qr).await?;
        }
        Command::Update { id, draft: args } => {
            let current = certificates.get(&id).await?;
            let draft = apply(current.to_draft(), &args);
            let qr = read_qr(&args).await?;
            certificates.update(&id, &draft, qr).await?;
        }
        Command::Delete { id, yes } => {
            if !yes && !confirm(&format!("Do you want to delete certificate {id}?"))? {
                println!("Cancelled");
                return Ok(());
            }
            certificates.delete(&id).await?;
        }
        Command::Toggle { id, status } => {
            let status = match status {
                Some(status) => status,
                None => certificates.get(&id).await?.status().toggled(),
            };
            certificates.toggle(&id, status).await?;
        }
    }
    Ok(())
}

/// Overlay the given flags on a draft
fn apply(mut draft: CertificateDraft, args: &DraftArgs) -> CertificateDraft {
    let set = |target: &mut String, value: &Option<String>| {
        if let Some(value) = value {
            *target = value.clone();
        }
    };
    set(&mut draft.certificate_number, &args.number);
    set(&mut draft.standard, &args.standard);
    set(&mut draft.organization, &args.organization);
    set(&mut draft.country, &args.country);
    set(&mut draft.address, &args.address);
    set(&mut draft.scope, &args.scope);

    draft.date_of_initial_registration = args.initial_registration.or(draft.date_of_initial_registration);
    draft.date_of_issue = args.issued.or(draft.date_of_issue);
    draft.date_of_expiry = args.expires.or(draft.date_of_expiry);
    draft.recertification_due_date = args.recertification_due.or(draft.recertification_due_date);
    draft.status = args.status.or(draft.status);
    draft
}

async fn read_qr(args: &DraftArgs) -> Result<Option<QrImage>> {
    let Some(path) = &args.qr else {
        return Ok(None);
    };
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read QR image {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("qr.png")
        .to_string();
    Ok(Some(QrImage::new(file_name, bytes)))
}

fn print_table(items: &[Certificate]) {
    if items.is_empty() {
        println!("No certificates");
        return;
    }
    println!(
        "{:<26} {:<16} {:<14} {:<28} {:<8} {:<10}",
        "ID", "NUMBER", "STANDARD", "ORGANIZATION", "STATUS", "EXPIRES"
    );
    for (idx, cert) in items.iter().enumerate() {
        println!(
            "{:<26} {:<16} {:<14} {:<28} {:<8} {:<10}",
            cert.record_id().unwrap_or_else(|| (idx + 1).to_string()),
            or_dash(&cert.certificate_number),
            or_dash(&cert.standard),
            or_dash(&cert.organization),
            cert.status(),
            cert.expiry_date().map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
        );
    }
}

fn print_details(cert: &Certificate) {
    let date = |raw: &Option<String>| {
        raw.as_deref()
            .and_then(shared::models::parse_date)
            .map(|d| d.format("%d %b %Y").to_string())
            .unwrap_or_else(|| "-".into())
    };
    let rows = [
        ("ID", cert.record_id().unwrap_or_else(|| "-".into())),
        ("Certificate Number", or_dash(&cert.certificate_number).to_string()),
        ("Organization", or_dash(&cert.organization).to_string()),
        ("Standard", or_dash(&cert.standard).to_string()),
        ("Country", or_dash(&cert.country).to_string()),
        ("Address", or_dash(&cert.address).to_string()),
        ("Scope", or_dash(&cert.scope).to_string()),
        ("Date of Initial Registration", date(&cert.date_of_initial_registration)),
        ("Date of Issue", date(&cert.date_of_issue)),
        ("Date of Expiry", date(&cert.date_of_expiry)),
        ("Recertification Due Date", date(&cert.recertification_due_date)),
        ("QR Code Image", or_dash(&cert.qr_image).to_string()),
        ("Status", cert.status().to_string()),
    ];
    for (label, value) in rows {
        println!("{label:<30} {value}");
    }
}

fn or_dash(value: &Option<String>) -> &str {
    value.as_deref().filter(|s| !s.is_empty()).unwrap_or("-")
}

fn prompt_input(label: &str) -> Result<String> {
    Ok(Input::<String>::with_theme(&ColorfulTheme::default())
        .with_prompt(label)
        .interact_text()?)
}

fn prompt_password(label: &str, confirm: bool) -> Result<String> {
    let theme = ColorfulTheme::default();
    let mut prompt = Password::with_theme(&theme).with_prompt(label);
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    Ok(prompt.interact()?)
}

fn confirm(question: &str) -> Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(question)
        .default(false)
        .interact()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use shared::CertificateStatus;

    #[test]
    fn test_apply_keeps_unset_fields() {
        let current = CertificateDraft {
            certificate_number: "C-1".into(),
            standard: "ISO 9001".into(),
            date_of_issue: NaiveDate::from_ymd_opt(2024, 1, 1),
            status: Some(CertificateStatus::Valid),
            ..Default::default()
        };
        let args = DraftArgs {
            standard: Some("ISO 14001".into()),
            expires: NaiveDate::from_ymd_opt(2027, 1, 1),
            status: Some(CertificateStatus::Invalid),
            ..Default::default()
        };
        let draft = apply(current, &args);
        assert_eq!(draft.certificate_number, "C-1");
        assert_eq!(draft.standard, "ISO 14001");
        assert_eq!(draft.date_of_issue, NaiveDate::from_ymd_opt(2024, 1, 1));
        assert_eq!(draft.date_of_expiry, NaiveDate::from_ymd_opt(2027, 1, 1));
        assert_eq!(draft.status, Some(CertificateStatus::Invalid));
    }

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(&None), "-");
        assert_eq!(or_dash(&Some(String::new())), "-");
        assert_eq!(or_dash(&Some("x".into())), "x");
    }
}
