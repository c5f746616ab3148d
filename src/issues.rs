//! Non-fatal diagnostics accumulated across the pipeline.
//!
//! Every recoverable problem — slug conflicts, missing media, encoder
//! failures, broken links — lands here instead of aborting the run. The
//! collector is the only shared mutable state inside parallel regions:
//! workers hold a reference and append through a mutex.
//!
//! The full list is written out as `processor-issues.json`, the run's
//! authoritative diagnostic channel.

use serde::Serialize;
use std::sync::Mutex;

/// Where a media reference was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceOrigin {
    Frontmatter,
    Body,
}

/// Which media operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaOperation {
    Read,
    Optimize,
}

/// Which link syntax produced a broken reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Wiki,
    Markdown,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
#[serde(rename_all_fields = "camelCase")]
pub enum Issue {
    SlugConflict {
        file_path: String,
        desired: String,
        #[serde(rename = "final")]
        final_slug: String,
        conflicting_files: Vec<String>,
    },
    MissingMedia {
        file_path: String,
        media_path: String,
        referenced_from: ReferenceOrigin,
        original_reference: String,
        module: String,
    },
    MediaProcessingError {
        file_path: String,
        media_path: String,
        operation: MediaOperation,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        code: Option<String>,
    },
    BrokenLink {
        source_file: String,
        target: String,
        link_kind: LinkKind,
    },
}

/// Append-only, thread-safe issue sink.
#[derive(Debug, Default)]
pub struct IssueCollector {
    issues: Mutex<Vec<Issue>>,
}

impl IssueCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, issue: Issue) {
        self.issues.lock().unwrap().push(issue);
    }

    pub fn len(&self) -> usize {
        self.issues.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Consume the collector, returning all issues in append order.
    pub fn into_issues(self) -> Vec<Issue> {
        self.issues.into_inner().unwrap()
    }

    /// Snapshot of all issues so far.
    pub fn snapshot(&self) -> Vec<Issue> {
        self.issues.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issues_serialize_with_kebab_case_kind_tag() {
        let issue = Issue::SlugConflict {
            file_path: "b.md".into(),
            desired: "shared".into(),
            final_slug: "shared2".into(),
            conflicting_files: vec!["a.md".into()],
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["kind"], "slug-conflict");
        assert_eq!(json["filePath"], "b.md");
        assert_eq!(json["final"], "shared2");
        assert_eq!(json["conflictingFiles"][0], "a.md");
    }

    #[test]
    fn media_error_omits_absent_code() {
        let issue = Issue::MediaProcessingError {
            file_path: "a.md".into(),
            media_path: "img/x.jpg".into(),
            operation: MediaOperation::Optimize,
            message: "encode failed".into(),
            code: None,
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["kind"], "media-processing-error");
        assert_eq!(json["operation"], "optimize");
        assert!(json.get("code").is_none());
    }

    #[test]
    fn broken_link_serializes_both_kinds() {
        let issue = Issue::BrokenLink {
            source_file: "a.md".into(),
            target: "Nonexistent".into(),
            link_kind: LinkKind::Wiki,
        };
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["kind"], "broken-link");
        assert_eq!(json["linkKind"], "wiki");
        assert_eq!(json["sourceFile"], "a.md");
    }

    #[test]
    fn collector_appends_from_multiple_threads() {
        let collector = IssueCollector::new();
        std::thread::scope(|s| {
            for i in 0..8 {
                let collector = &collector;
                s.spawn(move || {
                    collector.push(Issue::BrokenLink {
                        source_file: format!("{i}.md"),
                        target: "X".into(),
                        link_kind: LinkKind::Markdown,
                    });
                });
            }
        });
        assert_eq!(collector.len(), 8);
    }

    #[test]
    fn into_issues_preserves_append_order() {
        let collector = IssueCollector::new();
        for i in 0..3 {
            collector.push(Issue::BrokenLink {
                source_file: format!("{i}.md"),
                target: "X".into(),
                link_kind: LinkKind::Wiki,
            });
        }
        let issues = collector.into_issues();
        assert_eq!(issues.len(), 3);
        match &issues[0] {
            Issue::BrokenLink { source_file, .. } => assert_eq!(source_file, "0.md"),
            other => panic!("unexpected issue: {other:?}"),
        }
    }
}
