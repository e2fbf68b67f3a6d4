//! Node kind catalog built from configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use tracing::{debug, instrument};

use crate::application::{ApplicationError, ApplicationResult};
use crate::config::{KindSettings, Settings};
use crate::domain::{NodeClass, TypeRegistry};

/// Builds a registry holding one node kind per configured tag.
///
/// Base kinds are constructed before the kinds extending them; an unknown
/// or cyclic base is a configuration error.
#[instrument(level = "debug", skip(settings))]
pub fn build_registry(settings: &Settings) -> ApplicationResult<Rc<TypeRegistry<NodeClass>>> {
    let registry = TypeRegistry::new("node kinds");
    let mut built: BTreeMap<String, Rc<NodeClass>> = BTreeMap::new();

    for tag in settings.kinds.keys() {
        let class = build_kind(tag, &settings.kinds, &mut built, &mut BTreeSet::new())?;
        class.register_type(&registry, None, None)?;
    }
    debug!(kinds = registry.len(), "kind catalog ready");
    Ok(Rc::new(registry))
}

fn build_kind(
    tag: &str,
    kinds: &BTreeMap<String, KindSettings>,
    built: &mut BTreeMap<String, Rc<NodeClass>>,
    visiting: &mut BTreeSet<String>,
) -> ApplicationResult<Rc<NodeClass>> {
    if let Some(class) = built.get(tag) {
        return Ok(Rc::clone(class));
    }
    let settings = kinds.get(tag).ok_or_else(|| ApplicationError::Config {
        message: format!("unknown base kind '{}'", tag),
    })?;
    if !visiting.insert(tag.to_string()) {
        return Err(ApplicationError::Config {
            message: format!("kind '{}' extends itself", tag),
        });
    }

    let mut class = NodeClass::new(class_name(tag))
        .with_tag(tag)
        .with_traits(settings.traits.iter().cloned());
    if let Some(base) = &settings.base {
        class = class.extends(build_kind(base, kinds, built, visiting)?);
    }
    visiting.remove(tag);

    let class = Rc::new(class);
    built.insert(tag.to_string(), Rc::clone(&class));
    Ok(class)
}

/// `"line-series"` → `"LineSeriesNode"`
fn class_name(tag: &str) -> String {
    let mut name: String = tag
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect();
    name.push_str("Node");
    name
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;
    use crate::domain::Tagged;

    fn kind(traits: &[&str], base: Option<&str>) -> KindSettings {
        KindSettings {
            traits: traits.iter().map(|t| t.to_string()).collect(),
            base: base.map(str::to_string),
        }
    }

    #[test]
    fn given_default_settings_when_building_then_registers_each_kind() {
        let registry = build_registry(&Settings::default()).unwrap();

        assert_eq!(registry.ids(), vec!["axis", "group", "series"]);
        assert!(registry.get("series").unwrap().has_trait("y"));
    }

    #[test]
    fn given_kind_with_base_when_building_then_inherits_traits() {
        let mut settings = Settings::default();
        settings
            .kinds
            .insert("area".to_string(), kind(&["filled"], Some("series")));

        let registry = build_registry(&settings).unwrap();

        let area = registry.get("area").unwrap();
        assert_eq!(area.own_tag().as_deref(), Some("area"));
        assert!(area.has_trait("x") && area.has_trait("filled"));
        assert!(Rc::ptr_eq(area.base().unwrap(), &registry.get("series").unwrap()));
    }

    #[test]
    fn given_unknown_base_when_building_then_config_error() {
        let mut settings = Settings::default();
        settings
            .kinds
            .insert("area".to_string(), kind(&[], Some("missing")));

        let result = build_registry(&settings);

        assert!(matches!(result, Err(ApplicationError::Config { .. })));
    }

    #[test]
    fn given_cyclic_bases_when_building_then_config_error() {
        let mut settings = Settings::default();
        settings.kinds.insert("a".to_string(), kind(&[], Some("b")));
        settings.kinds.insert("b".to_string(), kind(&[], Some("a")));

        let result = build_registry(&settings);

        assert!(matches!(result, Err(ApplicationError::Config { .. })));
    }

    #[rstest]
    #[case("series", "SeriesNode")]
    #[case("line-series", "LineSeriesNode")]
    #[case("x_axis", "XAxisNode")]
    fn test_class_name(#[case] tag: &str, #[case] expected: &str) {
        assert_eq!(class_name(tag), expected);
    }
}
