use std::io;

/// Hierarchical configuration, backed by a TOML document
pub struct Config {
    value: toml::Value,
}

impl Default for Config {
    fn default() -> Config {
        Config {
            value: toml::Value::Table(toml::map::Map::new()),
        }
    }
}

impl Config {
    fn lookup(&self, k: &str) -> Option<&toml::Value> {
        let mut item = &self.value;
        for key in k.split('.') {
            item = item.get(key)?;
        }
        Some(item)
    }

    /// Get an entry by path. If the input argument contains dots, the path is split
    /// into keys, each key being requested recursively.
    pub fn get<T: AsRef<str>>(&self, k: T) -> Option<&str> {
        self.lookup(k.as_ref())?.as_str()
    }

    /// Get an entry of type integer by path
    pub fn get_usize<T: AsRef<str>>(&self, k: T) -> Option<usize> {
        self.lookup(k.as_ref())?
            .as_integer()
            .and_then(|i| usize::try_from(i).ok())
    }

    /// Get an entry of type boolean by path
    pub fn get_bool<T: AsRef<str>>(&self, k: T) -> Option<bool> {
        self.lookup(k.as_ref())?.as_bool()
    }

    /// Set an entry by path, creating intermediate tables if needed.
    ///
    /// Returns false if a path component exists but is not a table.
    pub fn set<T: AsRef<str>, V: Into<toml::Value>>(&mut self, k: T, v: V) -> bool {
        let mut item = &mut self.value;
        let mut keys = k.as_ref().split('.').peekable();
        while let Some(key) = keys.next() {
            let table = match item.as_table_mut() {
                Some(table) => table,
                None => return false,
            };
            if keys.peek().is_none() {
                table.insert(key.to_owned(), v.into());
                return true;
            }
            item = table
                .entry(key.to_owned())
                .or_insert_with(|| toml::Value::Table(toml::map::Map::new()));
        }
        false
    }

    /// Load configuration from input object. If keys are already present, they are overwritten
    pub fn load_config<R: io::Read>(&mut self, mut config: R) -> Result<(), io::Error> {
        let mut s = String::new();
        config.read_to_string(&mut s)?;
        match toml::from_str::<toml::Table>(&s) {
            Ok(table) => {
                self.value = toml::Value::Table(table);
                Ok(())
            }
            Err(e) => {
                warn!("Could not parse configuration: {}", e);
                Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "Load configuration failed",
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Config;

    const CONFIG: &str = r#"
buffer_initial_capacity = 65536

[output]
summary = true
"#;

    #[test]
    fn config_load_and_get() {
        let mut config = Config::default();
        config.load_config(CONFIG.as_bytes()).expect("load config");
        assert_eq!(config.get_usize("buffer_initial_capacity"), Some(65536));
        assert_eq!(config.get_bool("output.summary"), Some(true));
        assert_eq!(config.get("output.summary"), None);
        assert_eq!(config.get_usize("missing.key"), None);
    }

    #[test]
    fn config_set_overrides() {
        let mut config = Config::default();
        assert!(config.set("max_packets", 10u32));
        assert!(config.set("output.summary", false));
        assert!(config.set("log.file", "out.log"));
        assert_eq!(config.get_usize("max_packets"), Some(10));
        assert_eq!(config.get_bool("output.summary"), Some(false));
        assert_eq!(config.get("log.file"), Some("out.log"));
        // cannot descend into a scalar
        assert!(!config.set("max_packets.inner", 1u32));
    }

    #[test]
    fn config_negative_integer() {
        let mut config = Config::default();
        config.set("skip_index", -1i64);
        assert_eq!(config.get_usize("skip_index"), None);
    }

    #[test]
    fn config_invalid_document() {
        let mut config = Config::default();
        assert!(config.load_config("not = [valid".as_bytes()).is_err());
    }
}
