//! Sending rendered payslips by email.
//!
//! [`Mailer`] is the seam the batch driver talks to; [`SmtpMailer`] is the production
//! implementation on top of `lettre`.

use std::time::Duration;

use lettre::address::AddressError;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, Message, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use log::debug;
use thiserror::Error;

use crate::builder::RenderedPayslip;
use crate::config::{ConfigError, SmtpSettings};
use crate::currency::format_with_symbol;
use crate::model::PayslipRecord;

const PDF_CONTENT_TYPE: &str = "application/pdf";
const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Errors raised while composing or sending one message.
#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid recipient address '{address}': {source}")]
    Address {
        address: String,
        #[source]
        source: AddressError,
    },
    #[error("failed to compose message: {0}")]
    Compose(String),
    #[error("SMTP delivery failed: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// A message with one PDF attachment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub body: String,
    pub attachment_name: String,
    pub attachment: Vec<u8>,
}

/// Capability to deliver an [`OutgoingMail`].
pub trait Mailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError>;
}

impl<T: Mailer + ?Sized> Mailer for &T {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        (**self).send(mail)
    }
}

/// Subject and body wording for payslip emails.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MailTemplate {
    currency_symbol: String,
}

impl MailTemplate {
    pub fn new(currency_symbol: impl Into<String>) -> Self {
        Self {
            currency_symbol: currency_symbol.into(),
        }
    }

    /// Builds the message that carries `rendered` to `to`.
    pub fn compose(&self, to: &str, record: &PayslipRecord, rendered: &RenderedPayslip) -> OutgoingMail {
        let greeting = match record.employee_name().trim() {
            "" => "Hello,".to_owned(),
            name => format!("Dear {},", name),
        };
        let body = format!(
            "{}\n\nPlease find attached your payslip for the pay period ending {}.\n\
             Net pay: {}\n\n{}\n",
            greeting,
            record.pay_date_label(),
            format_with_symbol(&self.currency_symbol, record.net_pay()),
            record.company_name(),
        );

        OutgoingMail {
            to: to.trim().to_owned(),
            subject: format!("Payslip for {}", record.pay_date_label()),
            body,
            attachment_name: rendered.filename.clone(),
            attachment: rendered.bytes.clone(),
        }
    }
}

/// Delivers mail through an SMTP relay.
pub struct SmtpMailer {
    transport: SmtpTransport,
    from: Mailbox,
}

impl SmtpMailer {
    /// Validates `settings` and prepares the transport. No connection is made yet.
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        settings.validate()?;
        let from = settings.from_mailbox()?;

        let mut builder = if settings.use_tls {
            SmtpTransport::relay(settings.host.trim())?.port(settings.port)
        } else {
            SmtpTransport::builder_dangerous(settings.host.trim()).port(settings.port)
        };
        if settings.has_credentials() {
            builder = builder.credentials(Credentials::new(
                settings.user.clone(),
                settings.password.clone(),
            ));
        }

        Ok(Self {
            transport: builder.timeout(Some(SMTP_TIMEOUT)).build(),
            from,
        })
    }
}

/// Builds the MIME message for `mail`.
pub fn build_message(from: Mailbox, mail: &OutgoingMail) -> Result<Message, MailError> {
    let to: Mailbox = mail.to.parse().map_err(|source| MailError::Address {
        address: mail.to.clone(),
        source,
    })?;
    let content_type =
        ContentType::parse(PDF_CONTENT_TYPE).map_err(|err| MailError::Compose(err.to_string()))?;
    let attachment = Attachment::new(mail.attachment_name.clone()).body(mail.attachment.clone(), content_type);

    Message::builder()
        .from(from)
        .to(to)
        .subject(mail.subject.as_str())
        .multipart(
            MultiPart::mixed()
                .singlepart(SinglePart::plain(mail.body.clone()))
                .singlepart(attachment),
        )
        .map_err(|err| MailError::Compose(err.to_string()))
}

impl Mailer for SmtpMailer {
    fn send(&self, mail: &OutgoingMail) -> Result<(), MailError> {
        let message = build_message(self.from.clone(), mail)?;
        let response = self.transport.send(&message)?;
        debug!("sent {} to {}: {:?}", mail.attachment_name, mail.to, response.code());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PeriodFields;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn record() -> PayslipRecord {
        let period = PeriodFields::new(
            NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            30,
            "Salmnine Investment Ltd",
            "Lagos",
        );
        PayslipRecord::builder(period)
            .employee_name("James Arthur")
            .basic_pay(dec!(400000))
            .tax(dec!(100000))
            .build()
            .unwrap()
    }

    fn rendered() -> RenderedPayslip {
        RenderedPayslip {
            filename: "James_Arthur_payslip.pdf".to_owned(),
            bytes: b"%PDF-1.3".to_vec(),
        }
    }

    #[test]
    fn template_mentions_date_and_net_pay() {
        let mail = MailTemplate::new("₦").compose(" james@example.com ", &record(), &rendered());
        assert_eq!(mail.to, "james@example.com");
        assert_eq!(mail.subject, "Payslip for 2024-05-31");
        assert!(mail.body.starts_with("Dear James Arthur,"));
        assert!(mail.body.contains("Net pay: ₦ 300,000.00"));
        assert_eq!(mail.attachment_name, "James_Arthur_payslip.pdf");
        assert_eq!(mail.attachment, b"%PDF-1.3");
    }

    #[test]
    fn message_carries_attachment() {
        let mail = MailTemplate::new("").compose("james@example.com", &record(), &rendered());
        let from: Mailbox = "payroll@example.com".parse().unwrap();
        let formatted = String::from_utf8(build_message(from, &mail).unwrap().formatted()).unwrap();
        assert!(formatted.contains("Subject: Payslip for 2024-05-31"));
        assert!(formatted.contains("application/pdf"));
        assert!(formatted.contains("James_Arthur_payslip.pdf"));
    }

    #[test]
    fn bad_recipient_is_reported() {
        let mail = MailTemplate::new("").compose("not an address", &record(), &rendered());
        let from: Mailbox = "payroll@example.com".parse().unwrap();
        assert!(matches!(build_message(from, &mail), Err(MailError::Address { .. })));
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let settings = SmtpSettings {
            host: String::new(),
            port: 465,
            user: String::new(),
            password: String::new(),
            from: "payroll@example.com".to_owned(),
            use_tls: true,
        };
        assert!(matches!(SmtpMailer::new(&settings), Err(MailError::Config(_))));
    }

    #[test]
    fn plain_transport_builds_without_connecting() {
        let settings = SmtpSettings {
            host: "localhost".to_owned(),
            port: 2525,
            user: String::new(),
            password: String::new(),
            from: "payroll@example.com".to_owned(),
            use_tls: false,
        };
        assert!(SmtpMailer::new(&settings).is_ok());
    }
}
