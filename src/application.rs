//! `Application`/`Applications`: the envelope types returned by the registry
//! bulk-fetch endpoints, grouping instances under their owning app name.

use itertools::Itertools;

use crate::instance::Instance;

#[derive(Debug, Clone)]
pub struct Application {
    pub name: String,
    pub instances: Vec<Instance>,
}

#[derive(Debug, Clone, Default)]
pub struct Applications {
    pub applications: Vec<Application>,
}

impl Applications {
    /// Groups a flat instance list into `Application`s, one per distinct
    /// `instance.app`, preserving first-seen app order.
    pub fn from_instances(instances: Vec<Instance>) -> Self {
        let applications = instances
            .into_iter()
            .into_group_map_by(|i| i.app.clone())
            .into_iter()
            .map(|(name, instances)| Application { name, instances })
            .collect();
        Applications { applications }
    }

    /// Looks up by application name, case-insensitively — Eureka app names
    /// are canonically uppercase, and callers routinely pass through a
    /// lowercase VIP or config value.
    pub fn get(&self, app_name: &str) -> Option<&Application> {
        let app_name = app_name.to_uppercase();
        self.applications.iter().find(|a| a.name.to_uppercase() == app_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Application> {
        self.applications.iter()
    }
}

impl Application {
    /// Panics in debug builds if an instance with a different `app` value was
    /// pushed into this application; the wire format guarantees this can't
    /// happen for well-formed server responses, so this is a defense against
    /// a malformed one slipping through a hand-built `Application`.
    pub fn push(&mut self, instance: Instance) {
        debug_assert_eq!(
            instance.app, self.name,
            "instance app {:?} does not match application name {:?}",
            instance.app, self.name
        );
        self.instances.push(instance);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instance::StatusType;

    fn instance(app: &str, host: &str) -> Instance {
        Instance {
            app: app.to_string(),
            host_name: host.to_string(),
            status: StatusType::Up,
            ..Instance::default()
        }
    }

    #[test]
    fn groups_instances_by_app_name() {
        let apps = Applications::from_instances(vec![
            instance("APPA", "h1"),
            instance("APPB", "h2"),
            instance("APPA", "h3"),
        ]);
        let app_a = apps.get("APPA").unwrap();
        assert_eq!(app_a.instances.len(), 2);
        let app_b = apps.get("APPB").unwrap();
        assert_eq!(app_b.instances.len(), 1);
    }

    #[test]
    fn get_on_missing_app_is_none() {
        let apps = Applications::from_instances(vec![instance("APPA", "h1")]);
        assert!(apps.get("NOPE").is_none());
    }

    #[test]
    fn get_is_case_insensitive() {
        let apps = Applications::from_instances(vec![instance("APPA", "h1")]);
        assert!(apps.get("appa").is_some());
        assert!(apps.get("ApPa").is_some());
    }
}
