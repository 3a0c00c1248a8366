use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        let expanded = crate::env::expand_env(&raw)
            .map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        Self::from_toml(&expanded)
    }

    /// Parse and validate configuration from a TOML string
    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    fn validate(&self) -> anyhow::Result<()> {
        self.validate_api_keys()?;
        self.validate_rules()?;
        self.validate_servers()?;
        Ok(())
    }

    fn validate_api_keys(&self) -> anyhow::Result<()> {
        for key in &self.auth.keys {
            if key.name.is_empty() {
                anyhow::bail!("api key {} has an empty name", key.id);
            }
        }
        Ok(())
    }

    fn validate_rules(&self) -> anyhow::Result<()> {
        for rule in &self.security.rules {
            if rule.name.is_empty() || rule.pattern.is_empty() {
                anyhow::bail!("security rule {} needs both a name and a pattern", rule.id);
            }
        }
        Ok(())
    }

    fn validate_servers(&self) -> anyhow::Result<()> {
        for (slug, server) in &self.mcp.servers {
            if slug == crate::McpConfig::BUILTIN_SLUG {
                anyhow::bail!("server slug `{slug}` is reserved for built-in tools");
            }
            if server.name.is_empty() {
                anyhow::bail!("mcp server `{slug}` has an empty name");
            }
        }
        Ok(())
    }
}
