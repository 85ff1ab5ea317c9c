//! ProfileFormAggregator — merges wizard stages into one flat draft.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use super::stage::{RepeatableGroup, WizardStage};

/// Flat field-key → value record accumulated by the wizard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProfileDraft(BTreeMap<String, String>);

impl ProfileDraft {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    fn insert(&mut self, key: String, value: String) {
        self.0.insert(key, value);
    }

    fn remove(&mut self, key: &str) {
        self.0.remove(key);
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ProfileDraft {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Accumulates field values across the wizard's stages.
///
/// Every key is merged independently with last-write-wins, regardless of
/// the order stages are visited in. Repeatable entries are plain indexed keys
/// (`company_0`, `company_1`, …); the aggregator only hands out their indices.
#[derive(Debug, Clone, Default)]
pub struct ProfileFormAggregator {
    draft: ProfileDraft,
    stage: WizardStage,
    next_index: HashMap<RepeatableGroup, usize>,
}

impl ProfileFormAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// The stage the wizard is currently showing.
    pub fn stage(&self) -> WizardStage {
        self.stage
    }

    /// Everything recorded so far.
    pub fn draft(&self) -> &ProfileDraft {
        &self.draft
    }

    /// Merge the fields of a completed stage into the draft.
    pub fn record_stage<I, K, V>(&mut self, fields: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        for (key, value) in fields {
            self.draft.insert(key.into(), value.into());
        }
    }

    /// Record the current stage and move to the next one.
    ///
    /// Returns the new stage, or `None` if the current stage is the last
    /// (the fields are still recorded).
    pub fn advance<I, K, V>(&mut self, fields: I) -> Option<WizardStage>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.record_stage(fields);
        let next = self.stage.next()?;
        self.stage = next;
        Some(next)
    }

    /// Move back one stage. Nothing recorded is discarded.
    pub fn go_back(&mut self) -> Option<WizardStage> {
        let prev = self.stage.previous()?;
        self.stage = prev;
        Some(prev)
    }

    /// Merge the last stage's fields and return the complete record.
    /// The stage cursor is left where it is.
    pub fn finalize<I, K, V>(&mut self, last_stage_fields: I) -> ProfileDraft
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.record_stage(last_stage_fields);
        self.draft.clone()
    }

    /// Reserve the next index for a new entry of `group`.
    ///
    /// Indices are never handed out twice within one wizard session.
    pub fn allocate_entry(&mut self, group: RepeatableGroup) -> usize {
        let slot = self.next_index.entry(group).or_insert(0);
        let index = *slot;
        *slot += 1;
        index
    }

    /// Number of indices handed out for `group`.
    pub fn allocated_entries(&self, group: RepeatableGroup) -> usize {
        self.next_index.get(&group).copied().unwrap_or(0)
    }

    /// Drop every field of one entry. Its index stays retired.
    pub fn remove_entry(&mut self, group: RepeatableGroup, index: usize) {
        for field in group.fields() {
            self.draft.remove(&group.key(field, index));
        }
    }

    /// Forget everything: after submission or when the wizard is abandoned.
    pub fn discard(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn none() -> std::iter::Empty<(&'static str, &'static str)> {
        std::iter::empty()
    }

    #[test]
    fn later_writes_win() {
        let mut agg = ProfileFormAggregator::new();
        agg.record_stage([("age", "26")]);
        agg.record_stage([("location", "Hanoi")]);
        agg.record_stage([("age", "27")]);
        let record = agg.finalize(none());

        let expected: ProfileDraft = [("age", "27"), ("location", "Hanoi")].into_iter().collect();
        assert_eq!(record, expected);
    }

    #[test]
    fn last_write_wins_for_every_key_over_a_sequence() {
        let stages: Vec<Vec<(&str, &str)>> = vec![
            vec![("age", "20"), ("location", "Hue")],
            vec![("desired_field", "Data")],
            vec![("job_title_0", "Intern"), ("company_0", "A")],
            vec![("age", "21"), ("job_title_0", "Engineer")],
            vec![],
            vec![("company_0", "B"), ("hobbies", "chess")],
        ];
        let mut agg = ProfileFormAggregator::new();
        let mut expected: BTreeMap<&str, &str> = BTreeMap::new();
        for stage in &stages {
            agg.record_stage(stage.iter().copied());
            for &(k, v) in stage {
                expected.insert(k, v);
            }
        }
        let record = agg.finalize([("salary_expectation", "Negotiable")]);
        expected.insert("salary_expectation", "Negotiable");

        assert_eq!(record.len(), expected.len());
        for (k, v) in expected {
            assert_eq!(record.get(k), Some(v), "wrong value for {k}");
        }
    }

    #[test]
    fn finalize_merges_last_stage_and_keeps_cursor() {
        let mut agg = ProfileFormAggregator::new();
        agg.advance([("age", "30")]);
        agg.advance([("desired_field", "Backend")]);
        assert_eq!(agg.stage(), WizardStage::Experience);

        let record = agg.finalize([("job_title_0", "Dev")]);
        assert_eq!(record.get("job_title_0"), Some("Dev"));
        assert_eq!(agg.stage(), WizardStage::Experience);
        assert_eq!(agg.draft(), &record);
    }

    #[test]
    fn revisiting_a_stage_overwrites_stale_values() {
        let mut agg = ProfileFormAggregator::new();
        agg.advance([("age", "26"), ("location", "Hanoi")]);
        agg.advance([("desired_field", "QA")]);
        assert_eq!(agg.go_back(), Some(WizardStage::DesiredField));
        assert_eq!(agg.go_back(), Some(WizardStage::PersonalInfo));
        assert_eq!(agg.go_back(), None);

        agg.advance([("age", "27"), ("location", "Hanoi")]);
        let record = agg.finalize([("desired_field", "Backend")]);
        assert_eq!(record.get("age"), Some("27"));
        assert_eq!(record.get("desired_field"), Some("Backend"));
    }

    #[test]
    fn advance_on_last_stage_still_records() {
        let mut agg = ProfileFormAggregator::new();
        for _ in 0..7 {
            assert!(agg.advance(none()).is_some());
        }
        assert_eq!(agg.stage(), WizardStage::Salary);
        assert_eq!(agg.advance([("salary_expectation", "$2000/month")]), None);
        assert_eq!(agg.draft().get("salary_expectation"), Some("$2000/month"));
    }

    #[test]
    fn absent_fields_stay_absent() {
        let mut agg = ProfileFormAggregator::new();
        let record = agg.finalize([("hobbies", "")]);
        assert_eq!(record.get("hobbies"), Some(""));
        assert_eq!(record.get("age"), None);
    }

    #[test]
    fn entry_indices_are_never_reused() {
        let mut agg = ProfileFormAggregator::new();
        let group = RepeatableGroup::Experience;
        let first = agg.allocate_entry(group);
        let second = agg.allocate_entry(group);
        assert_eq!((first, second), (0, 1));

        agg.record_stage([("job_title_1", "Dev"), ("company_1", "Acme"), ("job_title_0", "Intern")]);
        agg.remove_entry(group, 1);
        assert_eq!(agg.draft().get("company_1"), None);
        assert_eq!(agg.draft().get("job_title_0"), Some("Intern"));

        assert_eq!(agg.allocate_entry(group), 2);
        assert_eq!(agg.allocate_entry(RepeatableGroup::Certificate), 0);
        assert_eq!(agg.allocated_entries(group), 3);
    }

    #[test]
    fn discard_resets_everything() {
        let mut agg = ProfileFormAggregator::new();
        agg.allocate_entry(RepeatableGroup::Certificate);
        agg.advance([("age", "40")]);
        agg.discard();
        assert!(agg.draft().is_empty());
        assert_eq!(agg.stage(), WizardStage::PersonalInfo);
        assert_eq!(agg.allocated_entries(RepeatableGroup::Certificate), 0);
    }

    #[test]
    fn draft_serializes_as_flat_object() {
        let draft: ProfileDraft = [("age", "26"), ("job_title_0", "Dev")].into_iter().collect();
        let json = serde_json::to_value(&draft).unwrap();
        assert_eq!(json, serde_json::json!({"age": "26", "job_title_0": "Dev"}));
    }
}
