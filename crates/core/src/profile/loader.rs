use crate::error::{GleanerError, Result};
use crate::profile::directives::SiteProfile;
use crate::profile::parser::ProfileParser;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Loader for per-site profiles
#[derive(Debug, Clone)]
pub struct ProfileLoader {
    /// Custom profile directory path
    custom_dir: Option<PathBuf>,
    /// Standard profile directory path
    standard_dir: Option<PathBuf>,
    /// Profile cache, keyed by domain
    cache: HashMap<String, SiteProfile>,
}

impl ProfileLoader {
    /// Create a loader with no directories
    pub fn new() -> Self {
        Self { custom_dir: None, standard_dir: None, cache: HashMap::new() }
    }

    /// Load the profile for a URL
    pub fn load_for_url(&mut self, url: &str) -> Result<SiteProfile> {
        let domain = self.extract_domain(url)?;
        self.load_for_domain(&domain)
    }

    /// Load the profile for a domain
    ///
    /// Every matching file is merged, standard directory first and most
    /// specific name last, so custom and exact-domain files win: their scalar
    /// options override and their probes, aliases and cards are tried first.
    pub fn load_for_domain(&mut self, domain: &str) -> Result<SiteProfile> {
        if let Some(profile) = self.cache.get(domain) {
            return Ok(profile.clone());
        }

        let mut merged = SiteProfile::new();

        for file_path in self.find_profile_files(domain).iter().rev() {
            match ProfileParser::parse_file(file_path) {
                Ok(profile) => {
                    tracing::debug!(path = %file_path.display(), "site profile loaded");
                    merged.merge(&profile);
                }
                Err(e) => tracing::warn!(path = %file_path.display(), error = %e, "skipping unreadable site profile"),
            }
        }

        self.cache.insert(domain.to_string(), merged.clone());
        Ok(merged)
    }

    /// Load a profile by name (`<name>.txt`) regardless of domain
    pub fn load_named(&mut self, name: &str) -> Result<SiteProfile> {
        let file_name = format!("{name}.txt");
        let path = [&self.custom_dir, &self.standard_dir]
            .into_iter()
            .flatten()
            .map(|dir| dir.join(&file_name))
            .find(|path| path.exists())
            .ok_or_else(|| GleanerError::ProfileError(format!("No site profile named {name}")))?;

        ProfileParser::parse_file(path)
    }

    /// Find all profile files for a domain in priority order
    fn find_profile_files(&self, domain: &str) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let names = self.generate_profile_names(domain);

        for dir in [&self.custom_dir, &self.standard_dir].into_iter().flatten() {
            for name in &names {
                let file_path = dir.join(name);
                if file_path.exists() && !files.contains(&file_path) {
                    files.push(file_path);
                }
            }
        }

        files
    }

    /// Generate possible profile file names for a domain, most specific first
    fn generate_profile_names(&self, domain: &str) -> Vec<String> {
        let mut names = vec![format!("{domain}.txt")];

        if let Some(without_www) = domain.strip_prefix("www.") {
            names.push(format!("{without_www}.txt"));
        }

        if !domain.starts_with('.') {
            names.push(format!(".{domain}.txt"));
        }

        if let Some(without_www) = domain.strip_prefix("www.")
            && !without_www.starts_with('.')
        {
            names.push(format!(".{without_www}.txt"));
        }

        let parts: Vec<&str> = domain.split('.').collect();
        for i in 1..parts.len().saturating_sub(1) {
            let parent = parts[i..].join(".");
            let file = format!("{parent}.txt");
            if parent.contains('.') && !names.contains(&file) {
                names.push(file);
                names.push(format!(".{parent}.txt"));
            }
        }

        names
    }

    /// Extract domain from URL
    fn extract_domain(&self, url: &str) -> Result<String> {
        let url = url::Url::parse(url).map_err(|e| GleanerError::InvalidUrl(e.to_string()))?;

        let domain = url
            .host_str()
            .ok_or_else(|| GleanerError::InvalidUrl("No domain found in URL".to_string()))?;

        Ok(domain.to_string())
    }
}

/// Builder for ProfileLoader
#[derive(Debug, Default)]
pub struct ProfileLoaderBuilder {
    custom_dir: Option<PathBuf>,
    standard_dir: Option<PathBuf>,
}

impl ProfileLoaderBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Set custom profile directory
    pub fn custom_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.custom_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Set standard profile directory
    pub fn standard_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.standard_dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Build the ProfileLoader
    pub fn build(self) -> ProfileLoader {
        ProfileLoader { custom_dir: self.custom_dir, standard_dir: self.standard_dir, cache: HashMap::new() }
    }
}

impl Default for ProfileLoader {
    fn default() -> Self {
        let mut builder = ProfileLoaderBuilder::new();

        if let Some(custom_dir) = Self::default_custom_dir() {
            builder = builder.custom_dir(custom_dir);
        }

        if let Some(standard_dir) = Self::default_standard_dir() {
            builder = builder.standard_dir(standard_dir);
        }

        builder.build()
    }
}

impl ProfileLoader {
    /// Default custom profile directory (`~/.config/gleaner/sites`)
    fn default_custom_dir() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".config").join("gleaner").join("sites"))
    }

    /// Default standard profile directory
    fn default_standard_dir() -> Option<PathBuf> {
        let std_dir = PathBuf::from("site_profiles");
        if std_dir.exists() { Some(std_dir) } else { None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_generate_profile_names() {
        let loader = ProfileLoader::new();
        let names = loader.generate_profile_names("example.com");
        assert_eq!(names, vec!["example.com.txt".to_string(), ".example.com.txt".to_string()]);

        let names = loader.generate_profile_names("www.example.com");
        assert!(names.contains(&"www.example.com.txt".to_string()));
        assert!(names.contains(&"example.com.txt".to_string()));
        assert!(names.contains(&".example.com.txt".to_string()));
    }

    #[test]
    fn test_generate_profile_names_parent_domains() {
        let loader = ProfileLoader::new();
        let names = loader.generate_profile_names("search.portal.co.uk");

        assert_eq!(names[0], "search.portal.co.uk.txt");
        assert!(names.contains(&"portal.co.uk.txt".to_string()));
        assert!(names.contains(&".portal.co.uk.txt".to_string()));
        assert!(!names.iter().any(|n| n == "uk.txt" || n == ".uk.txt"));
    }

    #[test]
    fn test_extract_domain() {
        let loader = ProfileLoader::new();

        assert_eq!(loader.extract_domain("https://www.example.com/search?page=2").unwrap(), "www.example.com");
        assert!(matches!(loader.extract_domain("not a url"), Err(GleanerError::InvalidUrl(_))));
    }

    #[test]
    fn test_load_for_domain() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("example.com.txt"), "source: example\ncard: li.result\n").unwrap();

        let mut loader = ProfileLoaderBuilder::new().custom_dir(temp_dir.path()).build();
        let profile = loader.load_for_url("https://www.example.com/to-rent").unwrap();

        assert_eq!(profile.source.as_deref(), Some("example"));
        assert_eq!(profile.cards, vec!["li.result".to_string()]);
    }

    #[test]
    fn test_load_for_unknown_domain_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let mut loader = ProfileLoaderBuilder::new().custom_dir(temp_dir.path()).build();
        assert!(loader.load_for_domain("nowhere.test").unwrap().is_empty());
    }

    #[test]
    fn test_unreadable_profile_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("example.com.txt"), "nonsense line\n").unwrap();
        fs::write(temp_dir.path().join(".example.com.txt"), "source: parent\n").unwrap();

        let mut loader = ProfileLoaderBuilder::new().custom_dir(temp_dir.path()).build();
        let profile = loader.load_for_domain("example.com").unwrap();
        assert_eq!(profile.source.as_deref(), Some("parent"));
    }

    #[test]
    fn test_profile_caching() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("example.com.txt"), "container: adverts\n").unwrap();

        let mut loader = ProfileLoaderBuilder::new().custom_dir(temp_dir.path()).build();

        let first = loader.load_for_domain("example.com").unwrap();
        assert_eq!(loader.cache.len(), 1);

        let second = loader.load_for_domain("example.com").unwrap();
        assert_eq!(first, second);
        assert_eq!(loader.cache.len(), 1);
    }

    #[test]
    fn test_custom_overrides_standard() {
        let temp_dir = TempDir::new().unwrap();

        let custom_path = temp_dir.path().join("custom");
        fs::create_dir_all(&custom_path).unwrap();
        fs::write(custom_path.join("example.com.txt"), "source: custom\nmin_confidence: 50\n").unwrap();

        let standard_path = temp_dir.path().join("standard");
        fs::create_dir_all(&standard_path).unwrap();
        fs::write(standard_path.join("example.com.txt"), "source: standard\ncard: .card\nmin_confidence: 10\n")
            .unwrap();

        let mut loader = ProfileLoaderBuilder::new().custom_dir(&custom_path).standard_dir(&standard_path).build();
        let profile = loader.load_for_domain("example.com").unwrap();

        assert_eq!(profile.source.as_deref(), Some("custom"));
        assert_eq!(profile.min_confidence(), 50);
        assert_eq!(profile.cards, vec![".card".to_string()]);
    }

    #[test]
    fn test_custom_lists_tried_first() {
        let temp_dir = TempDir::new().unwrap();

        let custom_path = temp_dir.path().join("custom");
        fs::create_dir_all(&custom_path).unwrap();
        fs::write(
            custom_path.join("example.com.txt"),
            "binding: window.specific | specific\nfield: price = customPrice\ncard: .custom\n",
        )
        .unwrap();

        let standard_path = temp_dir.path().join("standard");
        fs::create_dir_all(&standard_path).unwrap();
        fs::write(
            standard_path.join("example.com.txt"),
            "binding: window.generic | generic\nfield: price = genericPrice\ncard: .generic\n",
        )
        .unwrap();

        let mut loader = ProfileLoaderBuilder::new().custom_dir(&custom_path).standard_dir(&standard_path).build();
        let profile = loader.load_for_domain("example.com").unwrap();

        let labels: Vec<&str> = profile.locations.iter().map(|l| l.label.as_str()).collect();
        assert_eq!(labels, vec!["specific", "generic"]);
        assert_eq!(profile.cards, vec![".custom".to_string(), ".generic".to_string()]);
        assert_eq!(profile.locator().locations()[0].label, "specific");

        let record = profile
            .field_map()
            .normalize(&serde_json::json!({"genericPrice": 1, "customPrice": 2}))
            .unwrap();
        assert_eq!(record.get("price"), Some(&serde_json::json!(2)));
    }

    #[test]
    fn test_exact_domain_before_parent() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("search.example.com.txt"), "card: .exact\n").unwrap();
        fs::write(temp_dir.path().join("example.com.txt"), "card: .parent\n").unwrap();

        let mut loader = ProfileLoaderBuilder::new().custom_dir(temp_dir.path()).build();
        let profile = loader.load_for_domain("search.example.com").unwrap();
        assert_eq!(profile.cards, vec![".exact".to_string(), ".parent".to_string()]);
    }

    #[test]
    fn test_load_named() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("portal-a.txt"), "source: portal-a\n").unwrap();

        let mut loader = ProfileLoaderBuilder::new().standard_dir(temp_dir.path()).build();
        assert_eq!(loader.load_named("portal-a").unwrap().source.as_deref(), Some("portal-a"));
        assert!(loader.load_named("portal-b").is_err());
    }
}
