//! Deterministic rule-based derivation
//!
//! Identical inputs always yield identical candidates, so this strategy is
//! the fallback for every remote failure and the default when no remote
//! service is configured.

use std::collections::HashSet;

use async_trait::async_trait;
use govplan_artifact::{ids, Epic, Feature, SectionSummary, Story};
use govplan_validate::{is_generic_criterion, is_tautological_with, ValidationPolicy};

use super::{DerivationContext, DerivationProvider};
use crate::config::DerivationPolicy;
use crate::error::ProviderError;

const HEADLINE_WORDS: usize = 6;

/// Deterministic provider built from section facts
#[derive(Debug, Clone, Default)]
pub struct RuleBasedProvider {
    policy: DerivationPolicy,
    validation: ValidationPolicy,
}

impl RuleBasedProvider {
    /// Create provider with derivation bounds and the policy it must satisfy
    #[inline]
    #[must_use]
    pub fn new(policy: DerivationPolicy, validation: ValidationPolicy) -> Self {
        Self { policy, validation }
    }

    /// Derivation bounds
    #[inline]
    #[must_use]
    pub fn policy(&self) -> &DerivationPolicy {
        &self.policy
    }

    /// Consecutive section groups, one per epic, covering every summary
    #[must_use]
    pub fn group_sections<'a>(&self, summaries: &'a [SectionSummary]) -> Vec<&'a [SectionSummary]> {
        if summaries.is_empty() {
            return Vec::new();
        }
        let wanted = summaries
            .len()
            .div_ceil(self.policy.sections_per_epic.max(1))
            .clamp(1, self.policy.max_epics.max(1));
        let size = summaries.len().div_ceil(wanted);
        summaries.chunks(size).collect()
    }

    /// Non-generic obligations chunked into at most `max_features` groups
    #[must_use]
    pub fn obligation_chunks(&self, summaries: &[&SectionSummary]) -> Vec<Vec<String>> {
        self.chunk_statements(summaries.iter().flat_map(|s| s.obligations.iter()))
    }

    /// Deduplicated (case-insensitive), non-generic statements in feature-sized chunks
    fn chunk_statements<'a>(&self, statements: impl Iterator<Item = &'a String>) -> Vec<Vec<String>> {
        let mut seen = HashSet::new();
        let statements: Vec<String> = statements
            .map(|o| o.trim().to_string())
            .filter(|o| !is_generic_criterion(o))
            .filter(|o| seen.insert(o.to_lowercase()))
            .collect();
        if statements.is_empty() {
            return Vec::new();
        }

        let per = self.policy.obligations_per_feature.max(1);
        let max_features = self.policy.max_features.max(1);
        let size = if statements.len().div_ceil(per) > max_features {
            statements.len().div_ceil(max_features)
        } else {
            per
        };
        statements.chunks(size).map(<[String]>::to_vec).collect()
    }

    fn epic_for_group(&self, ctx: &DerivationContext, group: &[SectionSummary], index: usize, total: usize) -> Epic {
        let titles: Vec<&str> = group.iter().map(|s| s.title.as_str()).collect();
        let (first, last) = (titles[0], titles[titles.len() - 1]);

        let title = if titles.len() == 1 {
            first.to_string()
        } else {
            format!("{first} through {last}")
        };
        let scope = if titles.len() == 1 {
            format!("section '{first}'")
        } else {
            format!("sections '{first}' to '{last}'")
        };
        let objective = format!(
            "Meet the obligations of {} set out in {scope}",
            ctx.document.display_title()
        );

        let refs: Vec<&SectionSummary> = group.iter().collect();
        let mut success_criteria: Vec<String> = self
            .obligation_chunks(&refs)
            .into_iter()
            .filter_map(|chunk| chunk.into_iter().next())
            .collect();
        if success_criteria.is_empty() {
            success_criteria.push(format!(
                "Requirements of {scope} are traced to delivered work"
            ));
        }

        Epic {
            epic_id: ids::epic_id(&ctx.document.document_id, index, total),
            title,
            objective,
            success_criteria,
            source_sections: group.iter().map(|s| s.section_id.clone()).collect(),
        }
    }

    fn acceptance_criteria(&self, chunk: &[String], short: &str) -> Vec<String> {
        let mut criteria: Vec<String> = chunk.to_vec();
        let padding = [
            format!("Evidence that '{short}' is met is retained for audit"),
            format!("An owner reviews '{short}' at least once a year"),
        ];
        for pad in padding {
            if criteria.len() >= self.validation.min_stories {
                break;
            }
            criteria.push(pad);
        }
        criteria.truncate(self.policy.max_stories.max(1));
        criteria
    }
}

#[async_trait]
impl DerivationProvider for RuleBasedProvider {
    fn name(&self) -> &str {
        "rule-based"
    }

    async fn derive_epics(
        &self,
        ctx: &DerivationContext,
        summaries: &[SectionSummary],
    ) -> Result<Vec<Epic>, ProviderError> {
        let groups = self.group_sections(summaries);
        let total = groups.len();
        let epics: Vec<Epic> = groups
            .into_iter()
            .enumerate()
            .map(|(i, group)| self.epic_for_group(ctx, group, i, total))
            .collect();
        tracing::debug!(sections = summaries.len(), epics = epics.len(), "rule-based epics");
        Ok(epics)
    }

    async fn derive_features(
        &self,
        ctx: &DerivationContext,
        epic: &Epic,
        summaries: &[SectionSummary],
    ) -> Result<Vec<Feature>, ProviderError> {
        let relevant: Vec<&SectionSummary> = summaries
            .iter()
            .filter(|s| epic.source_sections.contains(&s.section_id))
            .collect();

        let actor = relevant
            .iter()
            .flat_map(|s| s.actors.iter())
            .next()
            .map_or_else(|| "the organisation".to_string(), |a| format!("the {a}"));
        let risks: Vec<String> = relevant
            .iter()
            .flat_map(|s| s.constraints.iter().chain(s.references.iter()))
            .take(2)
            .map(|c| format!("Non-compliance with {c}"))
            .collect();
        let risks = if risks.is_empty() {
            vec![format!("Audit finding against '{}'", epic.title)]
        } else {
            risks
        };

        let mut chunks = if relevant.is_empty() {
            tracing::debug!(
                epic_id = %epic.epic_id,
                "no summary matches the epic's sections, deriving from its success criteria"
            );
            self.chunk_statements(epic.success_criteria.iter())
        } else {
            self.obligation_chunks(&relevant)
        };
        if chunks.is_empty() {
            let lead = epic
                .success_criteria
                .first()
                .cloned()
                .unwrap_or_else(|| format!("Requirements of '{}' are traced to delivered work", epic.title));
            chunks.push(vec![lead]);
        }

        let document_title = ctx.document.display_title();
        let features = chunks
            .iter()
            .take(self.policy.max_features.max(1))
            .enumerate()
            .map(|(k, chunk)| {
                let lead = chunk[0].trim_end_matches(['.', ';', ':']);
                let short = headline(lead);
                let title = if is_tautological_with(&short, &epic.title, self.validation.tautology_threshold) {
                    format!("Controls for {}", lower_first(&short))
                } else {
                    short.clone()
                };
                Feature {
                    feature_id: ids::feature_id(&ctx.project, &epic.epic_id, k + 1),
                    epic_id: epic.epic_id.clone(),
                    title,
                    description: format!(
                        "Put controls and evidence in place so that {}",
                        lower_first(lead)
                    ),
                    business_value: Some(format!(
                        "Lets {actor} demonstrate compliance with {document_title} and avoid audit findings on {}",
                        lower_first(&short)
                    )),
                    risk_of_not_delivering: risks.clone(),
                    acceptance_criteria: self.acceptance_criteria(chunk, &short),
                    governance_references: vec![ctx.reference(epic.source_sections.clone())],
                    parent_feature_id: None,
                }
            })
            .collect::<Vec<_>>();

        tracing::debug!(epic_id = %epic.epic_id, features = features.len(), "rule-based features");
        Ok(features)
    }

    async fn derive_stories(
        &self,
        ctx: &DerivationContext,
        feature: &Feature,
        epic: &Epic,
        governance_text: &str,
    ) -> Result<Vec<Story>, ProviderError> {
        let role = pick_role(governance_text);
        let references = if feature.governance_references.is_empty() {
            vec![ctx.reference(epic.source_sections.clone())]
        } else {
            feature.governance_references.clone()
        };

        let stories: Vec<Story> = feature
            .acceptance_criteria
            .iter()
            .map(|c| c.trim())
            .filter(|c| !is_generic_criterion(c))
            .take(self.policy.max_stories.max(1))
            .enumerate()
            .map(|(n, criterion)| Story {
                story_id: ids::story_id(&ctx.project, &feature.feature_id, n + 1, criterion),
                title: headline(criterion.trim_end_matches(['.', ';', ':'])),
                role: role.to_string(),
                capability: format!(
                    "to show that {}",
                    lower_first(criterion.trim_end_matches(['.', ';', ':']))
                ),
                benefit: format!("auditors can confirm '{}' is satisfied", feature.title),
                derived_from_feature: feature.feature_id.clone(),
                derived_from_epic: feature.epic_id.clone(),
                governance_references: references.clone(),
                acceptance_criteria: vec![criterion.to_string()],
            })
            .collect();

        tracing::debug!(feature_id = %feature.feature_id, stories = stories.len(), "rule-based stories");
        Ok(stories)
    }
}

/// First few words, capitalised, without trailing punctuation
fn headline(text: &str) -> String {
    let words: Vec<&str> = text.split_whitespace().take(HEADLINE_WORDS).collect();
    let joined = words.join(" ");
    let trimmed = joined.trim_end_matches(|c: char| !c.is_alphanumeric());
    let mut chars = trimmed.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => "Untitled".to_string(),
    }
}

fn lower_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        // keep acronyms such as "NIST" intact
        Some(c) if !chars.clone().next().is_some_and(char::is_uppercase) => {
            c.to_lowercase().chain(chars).collect()
        }
        _ => text.to_string(),
    }
}

fn pick_role(governance_text: &str) -> &'static str {
    let text = governance_text.to_lowercase();
    [
        ("administrator", "system administrator"),
        ("personnel", "agency staff member"),
        ("department", "department lead"),
        ("agency", "agency compliance officer"),
    ]
    .into_iter()
    .find(|(needle, _)| text.contains(needle))
    .map_or("compliance officer", |(_, role)| role)
}

#[cfg(test)]
mod tests {
    use super::*;
    use govplan_artifact::{ArtifactSet, DocumentMeta};
    use govplan_validate::{validate_story_id_format, validate_top_level_feature_id_format, HierarchyValidator};
    use pretty_assertions::assert_eq;

    fn summary(seq: usize, title: &str, obligations: &[&str]) -> SectionSummary {
        SectionSummary {
            section_id: format!("sec-policy-{seq:02}-0000000{seq}"),
            title: title.to_string(),
            obligations: obligations.iter().map(|s| (*s).to_string()).collect(),
            actors: vec!["agency".to_string()],
            ..SectionSummary::default()
        }
    }

    fn three_sections() -> Vec<SectionSummary> {
        vec![
            summary(1, "Access Control", &[
                "The agency must review access rights every quarter.",
                "Administrators shall revoke unused accounts within 30 days.",
            ]),
            summary(2, "Audit Logging", &[
                "Systems must retain audit logs for 365 days.",
                "Log records shall include user, time and action.",
            ]),
            summary(3, "Incident Response", &[
                "Incidents must be reported to the security office within 24 hours.",
                "The agency should test its response plan annually.",
            ]),
        ]
    }

    fn ctx() -> DerivationContext {
        DerivationContext::new("proj", DocumentMeta::new("policy").with_title("Security Policy"))
    }

    async fn derive_all(provider: &RuleBasedProvider, summaries: &[SectionSummary]) -> ArtifactSet {
        let ctx = ctx();
        let mut set = ArtifactSet::new();
        set.epics = provider.derive_epics(&ctx, summaries).await.unwrap();
        for epic in set.epics.clone() {
            let features = provider.derive_features(&ctx, &epic, summaries).await.unwrap();
            for feature in &features {
                let stories = provider
                    .derive_stories(&ctx, feature, &epic, "The agency must comply")
                    .await
                    .unwrap();
                set.stories.extend(stories);
            }
            set.features.extend(features);
        }
        set
    }

    #[tokio::test]
    async fn three_sections_yield_one_epic_two_features() {
        let provider = RuleBasedProvider::default();
        let set = derive_all(&provider, &three_sections()).await;

        assert_eq!(set.epics.len(), 1);
        assert_eq!(set.epics[0].epic_id, "epic-policy");
        assert_eq!(set.epics[0].source_sections.len(), 3);
        let ids: Vec<_> = set.features.iter().map(|f| f.feature_id.as_str()).collect();
        assert_eq!(ids, vec!["proj-epic-policy-feature-01", "proj-epic-policy-feature-02"]);
        assert_eq!(set.stories.len(), 6);
        assert!(set.features.iter().all(|f| validate_top_level_feature_id_format(&f.feature_id)));
        assert!(set.stories.iter().all(|s| validate_story_id_format(&s.story_id)));

        let report = HierarchyValidator::default()
            .with_document_id("policy")
            .validate(&set);
        assert!(report.valid, "{}", report.summary());
        assert!(report.warnings.is_empty(), "{}", report.summary());
    }

    #[tokio::test]
    async fn derivation_is_deterministic() {
        let provider = RuleBasedProvider::default();
        let a = derive_all(&provider, &three_sections()).await;
        let b = derive_all(&provider, &three_sections()).await;
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn epics_cover_every_section() {
        let policy = DerivationPolicy {
            sections_per_epic: 2,
            max_epics: 2,
            ..DerivationPolicy::default()
        };
        let provider = RuleBasedProvider::new(policy, ValidationPolicy::default());
        let summaries: Vec<_> = (1..=7).map(|i| summary(i, &format!("Part {i}"), &[])).collect();
        let epics = provider.derive_epics(&ctx(), &summaries).await.unwrap();

        assert_eq!(epics.len(), 2);
        assert_eq!(epics[1].epic_id, "epic-policy-02");
        let covered: usize = epics.iter().map(|e| e.source_sections.len()).sum();
        assert_eq!(covered, 7);
        assert!(epics.iter().all(|e| !e.success_criteria.is_empty()));
    }

    #[tokio::test]
    async fn sections_without_obligations_still_validate() {
        let provider = RuleBasedProvider::default();
        let summaries = vec![summary(1, "Purpose", &[])];
        let set = derive_all(&provider, &summaries).await;
        assert_eq!(set.features.len(), 1);
        assert_eq!(set.stories.len(), 2);
        let report = HierarchyValidator::default().validate(&set);
        assert!(report.valid, "{}", report.summary());
    }

    #[tokio::test]
    async fn generic_obligations_are_filtered() {
        let provider = RuleBasedProvider::default();
        let summaries = vec![summary(1, "Scope", &[
            "The system works correctly",
            "Backups must be encrypted at rest with AES-256.",
        ])];
        let set = derive_all(&provider, &summaries).await;
        assert!(set
            .features
            .iter()
            .flat_map(|f| f.acceptance_criteria.iter())
            .all(|c| !is_generic_criterion(c)));
    }

    #[tokio::test]
    async fn unmatched_epic_uses_only_its_own_criteria() {
        let provider = RuleBasedProvider::default();
        let epic = Epic {
            epic_id: "epic-policy".into(),
            title: "Physical Security".into(),
            objective: "Control entry to agency buildings".into(),
            success_criteria: vec!["Visitors must be escorted inside secure areas.".into()],
            source_sections: vec!["sec-other-99-deadbeef".into()],
        };
        let summaries = three_sections();
        let features = provider.derive_features(&ctx(), &epic, &summaries).await.unwrap();

        assert_eq!(features.len(), 1);
        let criteria = &features[0].acceptance_criteria;
        assert_eq!(criteria[0], "Visitors must be escorted inside secure areas.");
        let foreign: Vec<&String> = summaries.iter().flat_map(|s| s.obligations.iter()).collect();
        assert!(criteria.iter().all(|c| !foreign.contains(&c)), "{criteria:?}");
        assert!(features[0].business_value.as_deref().unwrap().contains("the organisation"));
    }

    #[test]
    fn obligations_rechunk_above_feature_ceiling() {
        let provider = RuleBasedProvider::default();
        let obligations: Vec<String> = (0..20).map(|i| format!("Control {i} must be documented")).collect();
        let refs: Vec<&str> = obligations.iter().map(String::as_str).collect();
        let s = summary(1, "Controls", &refs);
        let chunks = provider.obligation_chunks(&[&s]);
        assert_eq!(chunks.len(), 5);
        assert!(chunks.iter().all(|c| c.len() == 4));
    }

    #[test]
    fn text_helpers() {
        assert_eq!(headline("the agency must review access rights every quarter."), "The agency must review access rights");
        assert_eq!(lower_first("Backups must"), "backups must");
        assert_eq!(lower_first("NIST controls"), "NIST controls");
        assert_eq!(pick_role("Administrators shall"), "system administrator");
        assert_eq!(pick_role(""), "compliance officer");
    }
}
