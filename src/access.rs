use std::sync::Arc;
use std::time::Instant;

use strum_macros::IntoStaticStr;
use tracing::{debug, warn};

use crate::cache::{CacheKey, EvaluationCache};
use crate::error::Result;
use crate::metrics::{EvaluationPhases, EvaluationStats, MetricsSink, NoOpSink};
use crate::privilege_set::{PrivilegeSet, PrivilegeState};
use crate::privileges::{Privilege, PrivilegeCatalog, PrivilegeType};
use crate::timers::{PhaseTimer, elapsed_ms};
use crate::traits::HrefResolver;
use crate::types::{AccessPrincipal, Acl, CurrentAccess, WhoType};

/// Which stage of the lookup produced the privileges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
enum Tier {
    Owner,
    OwnerDefault,
    User,
    ResourceLike,
    Group,
    Authenticated,
    Other,
    Unauthenticated,
    All,
}

/// The access evaluator. Cheap to clone and safe to share between threads.
#[derive(Clone)]
pub struct Access {
    catalog: Arc<PrivilegeCatalog>,
    cache: Option<Arc<EvaluationCache>>,
    sink: Arc<dyn MetricsSink>,
}

impl Access {
    /// An evaluator with no cache and no metrics.
    pub fn new(catalog: Arc<PrivilegeCatalog>) -> Self {
        Access {
            catalog,
            cache: None,
            sink: Arc::new(NoOpSink),
        }
    }

    /// Memoize results in `cache`. The cache may be shared by several
    /// evaluators built on the same catalog.
    pub fn with_cache(mut self, cache: Arc<EvaluationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_metrics_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn catalog(&self) -> &Arc<PrivilegeCatalog> {
        &self.catalog
    }

    pub fn cache(&self) -> Option<&Arc<EvaluationCache>> {
        self.cache.as_ref()
    }

    /// Decide whether `who` may exercise every privilege in `how` on an
    /// entity owned by `owner` and protected by the encoded ACL `acl`.
    ///
    /// An empty `how` asks whether any privilege other than `none` is
    /// allowed. The resolved set is clamped to `filter` when one is given.
    /// A malformed ACL is an error; a requester no entry applies to is
    /// simply denied.
    pub fn evaluate_access(
        &self,
        resolver: &dyn HrefResolver,
        who: &dyn AccessPrincipal,
        owner: &dyn AccessPrincipal,
        how: &[Arc<Privilege>],
        acl: &str,
        filter: Option<&PrivilegeSet>,
    ) -> Result<CurrentAccess> {
        let start = Instant::now();
        // Only the requested slots, so the key tells {read} and {read, read-acl} apart.
        let desired = how.iter().fold(PrivilegeSet::unspecified(), |set, p| {
            set.with_state(p.kind(), PrivilegeState::Allowed)
        });

        debug!(
            event = "Access",
            phase = "Evaluation",
            owner = owner.principal_ref(),
            accessor = who.principal_ref(),
            desired = %desired,
            acl_len = acl.len()
        );

        let mut phases = EvaluationPhases::default();
        let mut compute =
            || self.evaluate_uncached(resolver, who, owner, how, acl, filter, &mut phases);

        let outcome = match &self.cache {
            Some(cache) => {
                let key = CacheKey {
                    owner: owner.principal_ref(),
                    accessor: who.principal_ref(),
                    desired: &desired,
                    filter,
                    acl,
                };
                cache.get_or_evaluate(&key, compute)
            }
            None => compute().map(|access| (access, false)),
        };

        let (access, cache_hit) = outcome.inspect_err(|err| {
            warn!(
                event = "Access",
                phase = "Decode",
                owner = owner.principal_ref(),
                accessor = who.principal_ref(),
                error = %err
            );
        })?;

        let stats = EvaluationStats {
            duration: start.elapsed(),
            allowed: access.access_allowed(),
            cache_hit,
            accessor: who.principal_ref().to_string(),
            owner: owner.principal_ref().to_string(),
        };
        if !cache_hit {
            phases.total_ms = elapsed_ms(start);
            self.sink.on_evaluation_phases(&stats, &phases);
        }
        self.sink.on_evaluation(&stats);

        debug!(
            event = "Access",
            phase = "Result",
            allowed = access.access_allowed(),
            cache_hit,
            result = %access
        );
        Ok(access)
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_uncached(
        &self,
        resolver: &dyn HrefResolver,
        who: &dyn AccessPrincipal,
        owner: &dyn AccessPrincipal,
        how: &[Arc<Privilege>],
        acl: &str,
        filter: Option<&PrivilegeSet>,
        phases: &mut EvaluationPhases,
    ) -> Result<CurrentAccess> {
        let acl = {
            let _timer = PhaseTimer::new(&mut phases.decode_ms);
            Acl::decode(&self.catalog, acl, None)?
        };

        let _timer = PhaseTimer::new(&mut phases.resolve_ms);

        let authenticated = !who.unauthenticated();
        let is_owner = authenticated && who.principal_ref() == owner.principal_ref();

        let Some((tier, privileges)) = resolve_tiers(resolver, who, is_owner, &acl) else {
            debug!(event = "Access", phase = "Tier", tier = "none");
            return Ok(CurrentAccess::denied());
        };
        let tier: &'static str = tier.into();
        debug!(event = "Access", phase = "Tier", tier, privileges = %privileges);

        let mut privileges = privileges.set_unspecified(is_owner);
        if let Some(filter) = filter {
            privileges = privileges.filter(filter);
        }

        let allowed = if how.is_empty() {
            privileges
                .allowed_types()
                .iter()
                .any(|kind| *kind != PrivilegeType::None)
        } else {
            how.iter().all(|p| {
                privileges
                    .get_privilege(p.index())
                    .is_some_and(|state| state.is_allowed())
            })
        };

        Ok(CurrentAccess::new(Some(privileges), allowed))
    }
}

/// Walk the tiers in order and return the privileges of the first one with
/// a matching entry.
///
/// The owner falls back to full access when no owner entry exists.
/// Unauthenticated requesters only see the unauthenticated and all tiers.
fn resolve_tiers(
    resolver: &dyn HrefResolver,
    who: &dyn AccessPrincipal,
    is_owner: bool,
    acl: &Acl,
) -> Option<(Tier, PrivilegeSet)> {
    let unnamed = |tiers: &[(WhoType, Tier)]| {
        tiers.iter().find_map(|(who_type, tier)| {
            acl.privileges_for(resolver, *who_type, None)
                .map(|p| (*tier, p))
        })
    };

    if who.unauthenticated() {
        return unnamed(&[
            (WhoType::Unauthenticated, Tier::Unauthenticated),
            (WhoType::All, Tier::All),
        ]);
    }

    if is_owner {
        return Some(
            acl.privileges_for(resolver, WhoType::Owner, None)
                .map(|p| (Tier::Owner, p))
                .unwrap_or((Tier::OwnerDefault, PrivilegeSet::default_owner_privileges())),
        );
    }

    let href = Some(who.principal_ref());
    let kind = who.kind();

    if kind == WhoType::User {
        if let Some(p) = acl.privileges_for(resolver, WhoType::User, href) {
            return Some((Tier::User, p));
        }
    }

    if kind.is_resource_like() {
        if let Some(p) = acl.privileges_for(resolver, kind, href) {
            return Some((Tier::ResourceLike, p));
        }
    }

    let own_group = (kind == WhoType::Group).then(|| who.principal_ref());
    let groups = who
        .group_names()
        .iter()
        .map(String::as_str)
        .chain(own_group)
        .filter_map(|group| acl.privileges_for(resolver, WhoType::Group, Some(group)))
        .fold(None, |acc: Option<PrivilegeSet>, p| {
            Some(PrivilegeSet::merge(acc.as_ref(), &p, false))
        });
    if let Some(p) = groups {
        return Some((Tier::Group, p));
    }

    unnamed(&[
        (WhoType::Authenticated, Tier::Authenticated),
        (WhoType::Other, Tier::Other),
        (WhoType::All, Tier::All),
    ])
}

#[cfg(test)]
mod tests;
