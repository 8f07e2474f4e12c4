use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::options::PrintOptions;

// ============================================================================
// Print Job
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PrintJobStatus {
    Queued,
    Printing,
    Completed,
    Failed,
}

impl PrintJobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrintJobStatus::Queued => "QUEUED",
            PrintJobStatus::Printing => "PRINTING",
            PrintJobStatus::Completed => "COMPLETED",
            PrintJobStatus::Failed => "FAILED",
        }
    }

    /// QUEUED → PRINTING → COMPLETED | FAILED
    pub fn can_transition_to(&self, next: PrintJobStatus) -> bool {
        matches!(
            (self, next),
            (PrintJobStatus::Queued, PrintJobStatus::Printing)
                | (PrintJobStatus::Queued, PrintJobStatus::Failed)
                | (PrintJobStatus::Printing, PrintJobStatus::Completed)
                | (PrintJobStatus::Printing, PrintJobStatus::Failed)
        )
    }
}

impl std::str::FromStr for PrintJobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "QUEUED" => Ok(PrintJobStatus::Queued),
            "PRINTING" => Ok(PrintJobStatus::Printing),
            "COMPLETED" => Ok(PrintJobStatus::Completed),
            "FAILED" => Ok(PrintJobStatus::Failed),
            other => Err(format!("unknown print job status '{}'", other)),
        }
    }
}

/// One file printed with one set of options. Belongs to a user and a file;
/// attached to an order once the order is placed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrintJob {
    pub id: Uuid,
    pub file_id: Uuid,
    pub user_id: Uuid,
    pub order_id: Option<Uuid>,
    pub pages: u32,
    /// Stored options blob; see `PrintOptions::parse_lenient`
    pub options: Option<String>,
    pub status: PrintJobStatus,
    pub created_at: DateTime<Utc>,
}

impl PrintJob {
    pub fn queued(
        file_id: Uuid,
        user_id: Uuid,
        order_id: Uuid,
        pages: u32,
        options: &PrintOptions,
    ) -> serde_json::Result<Self> {
        Ok(Self {
            id: Uuid::now_v7(),
            file_id,
            user_id,
            order_id: Some(order_id),
            pages,
            options: Some(options.to_json()?),
            status: PrintJobStatus::Queued,
            created_at: Utc::now(),
        })
    }

    pub fn parsed_options(&self) -> Option<PrintOptions> {
        PrintOptions::parse_lenient(self.options.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::catalog::{ColorMode, PaperQuality, PaperSize, PrintSide};

    #[test]
    fn test_job_lifecycle_transitions() {
        use PrintJobStatus::*;
        assert!(Queued.can_transition_to(Printing));
        assert!(Printing.can_transition_to(Completed));
        assert!(Printing.can_transition_to(Failed));
        assert!(Queued.can_transition_to(Failed));

        assert!(!Queued.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(Printing));
        assert!(!Failed.can_transition_to(Queued));
        assert!(!Printing.can_transition_to(Printing));
    }

    #[test]
    fn test_status_parse() {
        assert_eq!("printing".parse::<PrintJobStatus>().unwrap(), PrintJobStatus::Printing);
        assert!("DONE".parse::<PrintJobStatus>().is_err());
    }

    #[test]
    fn test_queued_job_stores_canonical_options() {
        let options = PrintOptions {
            color: ColorMode::BlackWhite,
            paper_size: PaperSize::A4,
            paper_quality: PaperQuality::Gsm70,
            side: PrintSide::Double,
            binding: None,
        };
        let job = PrintJob::queued(Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), 12, &options).unwrap();

        assert_eq!(job.status, PrintJobStatus::Queued);
        assert_eq!(job.parsed_options(), Some(options));
    }

    #[test]
    fn test_malformed_options_parse_to_none() {
        let mut job = PrintJob::queued(
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            1,
            &PrintOptions {
                color: ColorMode::Color,
                paper_size: PaperSize::A3,
                paper_quality: PaperQuality::Gsm120,
                side: PrintSide::Single,
                binding: None,
            },
        )
        .unwrap();
        job.options = Some("color=red".to_string());
        assert_eq!(job.parsed_options(), None);
    }
}
