//! Typed view of a profile draft.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::draft::ProfileDraft;
use super::stage::RepeatableGroup;

/// One work-experience entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    pub job_title: Option<String>,
    pub company: Option<String>,
    pub duration: Option<String>,
    pub job_description: Option<String>,
}

/// One certificate entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub name: Option<String>,
    pub organization: Option<String>,
    pub issued: Option<String>,
}

/// A profile with repeatable groups as ordered lists of sub-records.
///
/// Blank values are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub age: Option<String>,
    pub location: Option<String>,
    pub desired_field: Option<String>,
    pub experiences: Vec<Experience>,
    pub school_name: Option<String>,
    pub study_period: Option<String>,
    pub achievements: Option<String>,
    pub certificates: Vec<Certificate>,
    pub hobbies: Option<String>,
    pub career_goals: Option<String>,
    pub salary_expectation: Option<String>,
}

impl ProfileRecord {
    /// Build from a flat draft. Entries are ordered by index; entries with
    /// no non-blank field are dropped.
    pub fn from_draft(draft: &ProfileDraft) -> Self {
        let scalar = |key: &str| non_blank(draft.get(key));

        let experiences = collect_entries(draft, RepeatableGroup::Experience)
            .into_values()
            .map(|fields| Experience {
                job_title: fields.get("job_title").cloned(),
                company: fields.get("company").cloned(),
                duration: fields.get("duration").cloned(),
                job_description: fields.get("job_description").cloned(),
            })
            .collect();

        let certificates = collect_entries(draft, RepeatableGroup::Certificate)
            .into_values()
            .map(|fields| Certificate {
                name: fields.get("cert_name").cloned(),
                organization: fields.get("cert_org").cloned(),
                issued: fields.get("cert_date").cloned(),
            })
            .collect();

        Self {
            age: scalar("age"),
            location: scalar("location"),
            desired_field: scalar("desired_field"),
            experiences,
            school_name: scalar("school_name"),
            study_period: scalar("study_period"),
            achievements: scalar("achievements"),
            certificates,
            hobbies: scalar("hobbies"),
            career_goals: scalar("career_goals"),
            salary_expectation: scalar("salary_expectation"),
        }
    }

    /// Render as a markdown summary for review before submission.
    pub fn to_summary(&self) -> String {
        let mut parts = vec!["# Profile".to_string()];

        let scalars = [
            ("Age", &self.age),
            ("Location", &self.location),
            ("Desired field", &self.desired_field),
            ("School", &self.school_name),
            ("Study period", &self.study_period),
            ("Achievements", &self.achievements),
            ("Hobbies", &self.hobbies),
            ("Career goals", &self.career_goals),
            ("Expected salary", &self.salary_expectation),
        ];
        for (label, value) in scalars {
            if let Some(value) = value {
                parts.push(format!("- **{label}:** {value}"));
            }
        }

        for exp in &self.experiences {
            let title = exp.job_title.as_deref().unwrap_or("(untitled role)");
            let mut line = format!("- **Experience:** {title}");
            if let Some(ref company) = exp.company {
                line.push_str(&format!(" at {company}"));
            }
            if let Some(ref duration) = exp.duration {
                line.push_str(&format!(", {duration}"));
            }
            parts.push(line);
        }

        for cert in &self.certificates {
            let name = cert.name.as_deref().unwrap_or("(unnamed certificate)");
            let mut line = format!("- **Certificate:** {name}");
            if let Some(ref org) = cert.organization {
                line.push_str(&format!(" from {org}"));
            }
            if let Some(ref issued) = cert.issued {
                line.push_str(&format!(" ({issued})"));
            }
            parts.push(line);
        }

        parts.join("\n")
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Group the draft's indexed keys for `group` by index, skipping blank values.
fn collect_entries(
    draft: &ProfileDraft,
    group: RepeatableGroup,
) -> BTreeMap<usize, BTreeMap<&'static str, String>> {
    let mut entries: BTreeMap<usize, BTreeMap<&'static str, String>> = BTreeMap::new();
    for (key, value) in draft.iter() {
        let Some((field, index)) = group.parse_key(key) else {
            continue;
        };
        let Some(value) = non_blank(Some(value)) else {
            continue;
        };
        // parse_key only matches names from the group's static field list.
        if let Some(field) = group.fields().iter().find(|f| **f == field) {
            entries.entry(index).or_default().insert(field, value);
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(pairs: &[(&str, &str)]) -> ProfileDraft {
        pairs.iter().copied().collect()
    }

    #[test]
    fn scalars_and_blank_values() {
        let record = ProfileRecord::from_draft(&draft(&[
            ("age", "26"),
            ("location", " Hanoi "),
            ("hobbies", "   "),
        ]));
        assert_eq!(record.age.as_deref(), Some("26"));
        assert_eq!(record.location.as_deref(), Some("Hanoi"));
        assert_eq!(record.hobbies, None);
        assert_eq!(record.career_goals, None);
    }

    #[test]
    fn experiences_ordered_by_index_with_gaps() {
        let record = ProfileRecord::from_draft(&draft(&[
            ("job_title_10", "Lead"),
            ("job_title_2", "Engineer"),
            ("company_2", "Acme"),
            ("job_title_0", "Intern"),
            ("duration_0", "2019"),
        ]));
        let titles: Vec<_> = record
            .experiences
            .iter()
            .map(|e| e.job_title.as_deref().unwrap())
            .collect();
        // Numeric, not lexicographic, order.
        assert_eq!(titles, ["Intern", "Engineer", "Lead"]);
        assert_eq!(record.experiences[1].company.as_deref(), Some("Acme"));
        assert_eq!(record.experiences[0].duration.as_deref(), Some("2019"));
    }

    #[test]
    fn all_blank_entries_are_dropped() {
        let record = ProfileRecord::from_draft(&draft(&[
            ("cert_name_0", ""),
            ("cert_org_0", " "),
            ("cert_name_1", "AWS SAA"),
            ("cert_org_1", "Amazon"),
            ("cert_date_1", "2023-04"),
        ]));
        assert_eq!(
            record.certificates,
            vec![Certificate {
                name: Some("AWS SAA".into()),
                organization: Some("Amazon".into()),
                issued: Some("2023-04".into()),
            }]
        );
    }

    #[test]
    fn summary_lists_filled_fields_only() {
        let record = ProfileRecord::from_draft(&draft(&[
            ("age", "26"),
            ("desired_field", "Backend"),
            ("job_title_0", "Developer"),
            ("company_0", "Acme"),
            ("cert_name_0", "TOEIC 850"),
        ]));
        let summary = record.to_summary();
        assert!(summary.contains("- **Age:** 26"));
        assert!(summary.contains("- **Desired field:** Backend"));
        assert!(summary.contains("- **Experience:** Developer at Acme"));
        assert!(summary.contains("- **Certificate:** TOEIC 850"));
        assert!(!summary.contains("Location"));
        assert!(!summary.contains("Expected salary"));
    }
}
