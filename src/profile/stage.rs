//! Wizard stages — the ordered sections of the profile form.

use serde::{Deserialize, Serialize};

/// A group of fields the user may repeat (one set per entry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepeatableGroup {
    Experience,
    Certificate,
}

impl RepeatableGroup {
    /// Base field names; each entry stores them as `<base>_<index>`.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::Experience => &["job_title", "company", "duration", "job_description"],
            Self::Certificate => &["cert_name", "cert_org", "cert_date"],
        }
    }

    /// Draft key for `field` in entry `index`.
    pub fn key(&self, field: &str, index: usize) -> String {
        format!("{field}_{index}")
    }

    /// Split an indexed key into `(field, index)` if it belongs to this group.
    pub fn parse_key<'a>(&self, key: &'a str) -> Option<(&'a str, usize)> {
        let (field, index) = key.rsplit_once('_')?;
        let index = index.parse().ok()?;
        self.fields().contains(&field).then_some((field, index))
    }
}

/// The stages of the profile wizard, in display order.
///
/// Progresses PersonalInfo → DesiredField → Experience → Education →
/// Certificates → Hobbies → CareerGoals → Salary. Going back is always allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStage {
    #[default]
    PersonalInfo,
    DesiredField,
    Experience,
    Education,
    Certificates,
    Hobbies,
    CareerGoals,
    Salary,
}

impl WizardStage {
    pub const ALL: [WizardStage; 8] = [
        Self::PersonalInfo,
        Self::DesiredField,
        Self::Experience,
        Self::Education,
        Self::Certificates,
        Self::Hobbies,
        Self::CareerGoals,
        Self::Salary,
    ];

    fn position(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0)
    }

    /// The following stage, if any.
    pub fn next(&self) -> Option<WizardStage> {
        Self::ALL.get(self.position() + 1).copied()
    }

    /// The preceding stage, if any.
    pub fn previous(&self) -> Option<WizardStage> {
        self.position().checked_sub(1).map(|i| Self::ALL[i])
    }

    pub fn is_first(&self) -> bool {
        self.previous().is_none()
    }

    pub fn is_last(&self) -> bool {
        self.next().is_none()
    }

    /// Human-readable section title.
    pub fn title(&self) -> &'static str {
        match self {
            Self::PersonalInfo => "Personal Information",
            Self::DesiredField => "Desired Job Field",
            Self::Experience => "Work Experience",
            Self::Education => "Education",
            Self::Certificates => "Certificates",
            Self::Hobbies => "Hobbies & Personal Activities",
            Self::CareerGoals => "Career Goals",
            Self::Salary => "Expected Salary",
        }
    }

    /// Scalar field keys collected by this stage.
    pub fn fields(&self) -> &'static [&'static str] {
        match self {
            Self::PersonalInfo => &["age", "location"],
            Self::DesiredField => &["desired_field"],
            Self::Education => &["school_name", "study_period", "achievements"],
            Self::Hobbies => &["hobbies"],
            Self::CareerGoals => &["career_goals"],
            Self::Salary => &["salary_expectation"],
            Self::Experience | Self::Certificates => &[],
        }
    }

    /// The repeatable group this stage collects, if it is a repeating stage.
    pub fn repeatable_group(&self) -> Option<RepeatableGroup> {
        match self {
            Self::Experience => Some(RepeatableGroup::Experience),
            Self::Certificates => Some(RepeatableGroup::Certificate),
            _ => None,
        }
    }
}

impl std::fmt::Display for WizardStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::PersonalInfo => "personal_info",
            Self::DesiredField => "desired_field",
            Self::Experience => "experience",
            Self::Education => "education",
            Self::Certificates => "certificates",
            Self::Hobbies => "hobbies",
            Self::CareerGoals => "career_goals",
            Self::Salary => "salary",
        };
        write!(f, "{s}")
    }
}
