//! Label interpretation: which entity a sample belongs to.
//!
//! Classification is an explicit lookup over a fixed set of label names,
//! walked in a fixed precedence order. The first label that is present and
//! non-empty decides the entity.

use std::borrow::Cow;

use super::Entity;

/// Label names that identify an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityLabel {
    Service,
    Router,
    Ingress,
}

impl EntityLabel {
    /// Label name as exposed by the proxy.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityLabel::Service => "service",
            EntityLabel::Router => "router",
            EntityLabel::Ingress => "ingress",
        }
    }

    fn entity(&self, value: &str) -> Entity {
        match self {
            EntityLabel::Service => Entity::Service(value.to_string()),
            EntityLabel::Router | EntityLabel::Ingress => Entity::Ingress(value.to_string()),
        }
    }
}

/// Precedence for samples of unknown or service scope: service wins over router.
pub const SERVICE_PRECEDENCE: [EntityLabel; 3] =
    [EntityLabel::Service, EntityLabel::Router, EntityLabel::Ingress];

/// Precedence for router-scoped families, where `service` names the backend.
pub const ROUTER_PRECEDENCE: [EntityLabel; 2] = [EntityLabel::Router, EntityLabel::Ingress];

/// Classifies a label set using [`SERVICE_PRECEDENCE`].
///
/// Returns `None` when no entity label is present and non-empty.
pub fn classify(labels: &[(&str, Cow<'_, str>)]) -> Option<Entity> {
    classify_scoped(labels, &SERVICE_PRECEDENCE)
}

/// Classifies a label set walking `precedence` in order.
pub fn classify_scoped(
    labels: &[(&str, Cow<'_, str>)],
    precedence: &[EntityLabel],
) -> Option<Entity> {
    precedence.iter().find_map(|label| {
        labels
            .iter()
            .find(|(k, _)| *k == label.as_str())
            .map(|(_, v)| v.as_ref())
            .filter(|v| !v.is_empty())
            .map(|v| label.entity(v))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels<'a>(pairs: &[(&'a str, &'a str)]) -> Vec<(&'a str, Cow<'a, str>)> {
        pairs.iter().map(|(k, v)| (*k, Cow::Borrowed(*v))).collect()
    }

    #[test]
    fn test_classify_service() {
        let l = labels(&[("code", "200"), ("service", "whoami@docker")]);
        assert_eq!(classify(&l), Some(Entity::Service("whoami@docker".into())));
    }

    #[test]
    fn test_classify_router_and_ingress_labels() {
        let l = labels(&[("router", "web@docker")]);
        assert_eq!(classify(&l), Some(Entity::Ingress("web@docker".into())));

        let l = labels(&[("ingress", "my-ingress@kubernetes")]);
        assert_eq!(
            classify(&l),
            Some(Entity::Ingress("my-ingress@kubernetes".into()))
        );
    }

    #[test]
    fn test_service_takes_precedence() {
        let l = labels(&[("router", "r@docker"), ("service", "s@docker")]);
        assert_eq!(classify(&l), Some(Entity::Service("s@docker".into())));
    }

    #[test]
    fn test_empty_values_fall_through() {
        let l = labels(&[("service", ""), ("router", "r@docker")]);
        assert_eq!(classify(&l), Some(Entity::Ingress("r@docker".into())));

        let l = labels(&[("service", ""), ("router", "")]);
        assert_eq!(classify(&l), None);
    }

    #[test]
    fn test_unattributable_sample() {
        let l = labels(&[("entrypoint", "web"), ("code", "200")]);
        assert_eq!(classify(&l), None);
        assert_eq!(classify(&[]), None);
    }

    #[test]
    fn test_router_scope_ignores_backend_service() {
        let l = labels(&[("router", "r@docker"), ("service", "s@docker")]);
        assert_eq!(
            classify_scoped(&l, &ROUTER_PRECEDENCE),
            Some(Entity::Ingress("r@docker".into()))
        );

        let l = labels(&[("service", "s@docker")]);
        assert_eq!(classify_scoped(&l, &ROUTER_PRECEDENCE), None);
    }
}
