//! HTML shell wrapped around campaign content.
//!
//! The user-authored body is inserted unescaped into a styled card with a
//! footer, rendered with askama from `templates/campaign.html`.
//!
//! ```
//! let html = bulkmail::render_campaign_html("<h1>Hello</h1>").unwrap();
//! assert!(html.contains("<h1>Hello</h1>"));
//! assert!(html.starts_with("<!DOCTYPE html>"));
//! ```

use askama::Template;
use chrono::{Datelike, Utc};

use crate::error::MailError;

/// Company name shown in the footer when none is set.
pub const DEFAULT_COMPANY: &str = "Your Company";

#[derive(Template)]
#[template(path = "campaign.html")]
pub struct CampaignTemplate<'a> {
    content: &'a str,
    company: &'a str,
    year: i32,
}

impl<'a> CampaignTemplate<'a> {
    pub fn new(content: &'a str) -> Self {
        Self {
            content,
            company: DEFAULT_COMPANY,
            year: Utc::now().year(),
        }
    }

    /// Set the footer company name. It is HTML-escaped.
    pub fn company(mut self, company: &'a str) -> Self {
        self.company = company;
        self
    }

    /// Set the footer copyright year.
    pub fn year(mut self, year: i32) -> Self {
        self.year = year;
        self
    }

    pub fn to_html(&self) -> Result<String, MailError> {
        Ok(self.render()?)
    }
}

/// Wrap `content` in the default email shell.
pub fn render_campaign_html(content: &str) -> Result<String, MailError> {
    CampaignTemplate::new(content).to_html()
}
