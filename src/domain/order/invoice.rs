use std::collections::{HashMap, HashSet};

use serde::Serialize;
use uuid::Uuid;

use crate::domain::print_job::{PrintJob, PrintOptions};

// ============================================================================
// Invoice Grouping
// ============================================================================
//
// Splits an order's print jobs into invoice blocks:
// 1. With binding groups: one "Binding Group N" block per group, holding the
//    jobs whose file is in that group.
// 2. Jobs not covered by a binding group (or every job, when the order has
//    none) are bucketed by their parsed print options in first-seen order,
//    one "Print Group N" block per distinct option set.
//
// Options are compared after parsing, so two blobs that differ only in key
// order or legacy spelling land in the same block. Blobs that cannot be
// parsed are bucketed by their trimmed raw text.
//
// Every job appears in exactly one block; job order inside a block follows
// the order's job order.
//
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceGroupKind {
    Binding,
    Print,
}

#[derive(Debug, Clone)]
pub struct InvoiceGroup<'a> {
    pub label: String,
    pub kind: InvoiceGroupKind,
    /// Shared options of a print block, when they could be parsed
    pub options: Option<PrintOptions>,
    pub jobs: Vec<&'a PrintJob>,
}

impl InvoiceGroup<'_> {
    pub fn pages(&self) -> u32 {
        self.jobs.iter().map(|j| j.pages).sum()
    }

    pub fn job_ids(&self) -> Vec<Uuid> {
        self.jobs.iter().map(|j| j.id).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum OptionsKey {
    Parsed(PrintOptions),
    Unparsed(Option<String>),
}

impl OptionsKey {
    fn of(job: &PrintJob) -> Self {
        match job.parsed_options() {
            Some(options) => OptionsKey::Parsed(options),
            None => OptionsKey::Unparsed(
                job.options
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string),
            ),
        }
    }
}

pub fn group_for_invoice<'a>(
    jobs: &'a [PrintJob],
    binding_groups: Option<&[Vec<Uuid>]>,
) -> Vec<InvoiceGroup<'a>> {
    let mut blocks = Vec::new();
    let mut assigned: HashSet<Uuid> = HashSet::new();

    for files in binding_groups.unwrap_or_default() {
        let members: HashSet<&Uuid> = files.iter().collect();
        let group_jobs: Vec<&PrintJob> = jobs
            .iter()
            .filter(|job| members.contains(&job.file_id) && !assigned.contains(&job.id))
            .collect();

        if group_jobs.is_empty() {
            continue;
        }
        assigned.extend(group_jobs.iter().map(|j| j.id));

        blocks.push(InvoiceGroup {
            label: format!("Binding Group {}", blocks.len() + 1),
            kind: InvoiceGroupKind::Binding,
            options: None,
            jobs: group_jobs,
        });
    }

    let mut buckets: Vec<(OptionsKey, Vec<&PrintJob>)> = Vec::new();
    let mut index: HashMap<OptionsKey, usize> = HashMap::new();

    for job in jobs.iter().filter(|job| !assigned.contains(&job.id)) {
        let key = OptionsKey::of(job);
        match index.get(&key) {
            Some(&slot) => buckets[slot].1.push(job),
            None => {
                index.insert(key.clone(), buckets.len());
                buckets.push((key, vec![job]));
            }
        }
    }

    for (number, (key, group_jobs)) in buckets.into_iter().enumerate() {
        blocks.push(InvoiceGroup {
            label: format!("Print Group {}", number + 1),
            kind: InvoiceGroupKind::Print,
            options: match key {
                OptionsKey::Parsed(options) => Some(options),
                OptionsKey::Unparsed(_) => None,
            },
            jobs: group_jobs,
        });
    }

    blocks
}
