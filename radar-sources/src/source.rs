//! The uniform source client contract

use async_trait::async_trait;
use radar_core::{Founder, ProfileLink, RadarResult, SourceKind, SourcePayload};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One lookup against one source for one founder
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceRequest {
    pub kind: SourceKind,
    /// URL for profile sources, `"{name} @ {affiliation}"` for academic lookups
    pub identifier: String,
    pub founder_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
}

impl SourceRequest {
    pub fn for_link(founder: &Founder, link: &ProfileLink) -> Self {
        Self {
            kind: link.kind,
            identifier: link.url.clone(),
            founder_name: founder.name.clone(),
            affiliation: founder.affiliation().map(str::to_string),
        }
    }

    /// Academic metrics request, when the founder qualifies for one
    pub fn academic(founder: &Founder) -> Option<Self> {
        if !founder.wants_academic_metrics() {
            return None;
        }
        let affiliation = founder.affiliation()?;
        Some(Self {
            kind: SourceKind::Academic,
            identifier: format!("{} @ {}", founder.name, affiliation),
            founder_name: founder.name.clone(),
            affiliation: Some(affiliation.to_string()),
        })
    }

    /// Every request applicable to a founder, in declared order (academic last)
    pub fn plan(founder: &Founder) -> Vec<Self> {
        let mut requests: Vec<Self> = founder
            .profile_links()
            .iter()
            .map(|link| Self::for_link(founder, link))
            .collect();
        requests.extend(Self::academic(founder));
        requests
    }
}

/// Results of a batched call, keyed by request identifier
pub type BatchResults = HashMap<String, RadarResult<SourcePayload>>;

/// Trait for external data sources.
///
/// Clients do not retry and do not enforce the pipeline timeout; both belong to the
/// research task wrapping them. Implementations must be safe to call concurrently.
#[async_trait]
pub trait SourceClient: Send + Sync {
    /// Name used in logs and failure reasons
    fn name(&self) -> &str;

    async fn fetch(&self, request: &SourceRequest) -> RadarResult<SourcePayload>;

    /// Whether `fetch_batch` issues a single upstream call
    fn supports_batch(&self) -> bool {
        false
    }

    /// Fetch several requests at once. Every requested identifier has an entry in the
    /// returned map; the default implementation fetches one by one.
    async fn fetch_batch(&self, requests: &[SourceRequest]) -> RadarResult<BatchResults> {
        let mut results = HashMap::with_capacity(requests.len());
        for request in requests {
            let result = self.fetch(request).await;
            results.insert(request.identifier.clone(), result);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use radar_core::FounderRole;

    #[test]
    fn test_plan_follows_declared_order_with_academic_last() {
        let founder = Founder::new("Ada Lovelace", FounderRole::Both)
            .with_url("https://github.com/ada")
            .with_url("https://linkedin.com/in/ada")
            .with_affiliation("University of London");

        let plan = SourceRequest::plan(&founder);
        let kinds: Vec<_> = plan.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![SourceKind::GitHub, SourceKind::LinkedIn, SourceKind::Academic]
        );
        assert_eq!(plan[2].identifier, "Ada Lovelace @ University of London");
    }

    #[test]
    fn test_plan_skips_academic_for_business_founders() {
        let founder = Founder::new("Bo", FounderRole::NonTechnical)
            .with_url("https://linkedin.com/in/bo")
            .with_affiliation("HSG");

        let plan = SourceRequest::plan(&founder);
        assert!(plan.iter().all(|r| r.kind != SourceKind::Academic));
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_plan_is_empty_without_links() {
        let founder = Founder::new("Cy", FounderRole::Technical);
        assert!(SourceRequest::plan(&founder).is_empty());
    }
}
