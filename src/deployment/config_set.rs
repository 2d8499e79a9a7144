use super::config::Config;
use crate::error::DeploymentError;
use std::collections::HashMap;

/// Configs keyed by full name, iterated in insertion order
#[derive(Debug, Clone, Default)]
pub struct ConfigSet {
    configs: Vec<Config>,
    index: HashMap<String, usize>,
}

impl ConfigSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a config, replacing any config with the same full name.
    ///
    /// The replacement keeps the position of the config it replaced, and the
    /// replaced config is returned.
    pub fn insert(&mut self, config: Config) -> Option<Config> {
        let full_name = config.full_name();

        match self.index.get(&full_name) {
            Some(&position) => {
                tracing::warn!("config {} replaces an earlier config with the same name", full_name);
                Some(std::mem::replace(&mut self.configs[position], config))
            }
            None => {
                self.index.insert(full_name, self.configs.len());
                self.configs.push(config);
                None
            }
        }
    }

    /// Insert a config, failing if its full name is already taken
    pub fn try_insert(&mut self, config: Config) -> Result<(), DeploymentError> {
        let full_name = config.full_name();
        if self.index.contains_key(&full_name) {
            return Err(DeploymentError::DuplicateFullName(full_name));
        }

        self.insert(config);
        Ok(())
    }

    pub fn get(&self, full_name: &str) -> Option<&Config> {
        self.index.get(full_name).map(|&i| &self.configs[i])
    }

    #[allow(dead_code)]
    pub fn contains(&self, full_name: &str) -> bool {
        self.index.contains_key(full_name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Config> {
        self.configs.iter()
    }

    pub fn len(&self) -> usize {
        self.configs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configs.is_empty()
    }
}

impl FromIterator<Config> for ConfigSet {
    fn from_iter<I: IntoIterator<Item = Config>>(iter: I) -> Self {
        let mut set = ConfigSet::new();
        for config in iter {
            set.insert(config);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(project: &str, name: &str, description: &str) -> Config {
        let yaml = format!(
            "name: {}\nproject: {}\ndescription: {}\nresources: []",
            name, project, description
        );
        Config::parse(&yaml, None, None).unwrap()
    }

    #[test]
    fn test_same_project_and_name_share_full_name() {
        let first = config("p", "net", "first");
        let second = config("p", "net", "second");

        assert_eq!(first.full_name(), second.full_name());
        assert_ne!(first, second);
    }

    #[test]
    fn test_insert_last_write_wins() {
        let configs = vec![
            config("p", "net", "first"),
            config("p", "vm", "only"),
            config("p", "net", "second"),
        ];

        let set: ConfigSet = configs.into_iter().collect();

        assert_eq!(set.len(), 2);
        assert_eq!(set.get("p.net").unwrap().description.as_deref(), Some("second"));

        // the replacement keeps the original slot
        let names: Vec<String> = set.iter().map(Config::full_name).collect();
        assert_eq!(names, vec!["p.net", "p.vm"]);
    }

    #[test]
    fn test_insert_returns_replaced_config() {
        let mut set = ConfigSet::new();
        assert!(set.insert(config("p", "net", "first")).is_none());

        let replaced = set.insert(config("p", "net", "second")).unwrap();
        assert_eq!(replaced.description.as_deref(), Some("first"));
    }

    #[test]
    fn test_try_insert_rejects_duplicates() {
        let mut set = ConfigSet::new();
        set.try_insert(config("p", "net", "first")).unwrap();

        let err = set.try_insert(config("p", "net", "second")).unwrap_err();

        assert_eq!(err, DeploymentError::DuplicateFullName("p.net".to_string()));
        assert_eq!(set.get("p.net").unwrap().description.as_deref(), Some("first"));
    }

    #[test]
    fn test_same_name_in_different_projects() {
        let mut set = ConfigSet::new();
        set.try_insert(config("p1", "net", "a")).unwrap();
        set.try_insert(config("p2", "net", "b")).unwrap();

        assert_eq!(set.len(), 2);
        assert!(set.contains("p1.net"));
        assert!(set.contains("p2.net"));
    }
}
