use std::collections::HashMap;
use std::fs;
use std::path::{
  Path,
  PathBuf
};

use anyhow::{
  Context,
  anyhow
};
use taskdeck_shared::{
  SortKey,
  SortOrder,
  TasksListArgs
};
use tracing::{
  debug,
  info,
  trace,
  warn
};

use crate::surface::Surface;

const RC_ENV_VAR: &str = "TASKDECKRC";
const RC_FILE_NAME: &str =
  ".taskdeckrc";

#[derive(Debug, Clone)]
pub struct Config {
  map: HashMap<String, String>,
  pub loaded_files: Vec<PathBuf>
}

impl Default for Config {
  fn default() -> Self {
    let mut map = HashMap::new();
    map.insert(
      "surface".to_string(),
      "member".to_string()
    );
    map.insert(
      "list.limit".to_string(),
      TasksListArgs::DEFAULT_LIMIT
        .to_string()
    );
    map.insert(
      "list.sort".to_string(),
      SortKey::default()
        .as_str()
        .to_string()
    );
    map.insert(
      "list.order".to_string(),
      SortOrder::default()
        .as_str()
        .to_string()
    );
    map.insert(
      "color".to_string(),
      "on".to_string()
    );
    Self {
      map,
      loaded_files: vec![]
    }
  }
}

impl Config {
  #[tracing::instrument(skip(
    rc_override
  ))]
  pub fn load(
    rc_override: Option<&Path>
  ) -> anyhow::Result<Self> {
    let mut cfg = Config::default();

    let rc =
      resolve_rc_path(rc_override)?;
    if let Some(path) = rc {
      info!(rc = %path.display(), "loading rc file");
      cfg.load_file(&path)?;
    } else {
      warn!(
        "no rc file found; using \
         defaults"
      );
    }

    Ok(cfg)
  }

  #[tracing::instrument(skip(
    self, overrides
  ))]
  pub fn apply_overrides<I>(
    &mut self,
    overrides: I
  ) where
    I: IntoIterator<
      Item = (String, String)
    >
  {
    for (k, v) in overrides {
      let key = k
        .strip_prefix("rc.")
        .unwrap_or(&k)
        .to_string();
      if key == "api.token" {
        debug!(key = %key, "applying override");
      } else {
        debug!(key = %key, value = %v, "applying override");
      }
      self.map.insert(key, v);
    }
  }

  pub fn get(
    &self,
    key: &str
  ) -> Option<String> {
    self.map.get(key).cloned()
  }

  pub fn api_url(
    &self
  ) -> anyhow::Result<String> {
    let raw =
      self.get("api.url").ok_or_else(
        || {
          anyhow!(
            "api.url is not configured; \
             set it in ~/.taskdeckrc or \
             pass --rc api.url=..."
          )
        }
      )?;
    let trimmed =
      raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
      return Err(anyhow!(
        "api.url cannot be empty"
      ));
    }
    Ok(trimmed.to_string())
  }

  pub fn api_token(
    &self
  ) -> Option<String> {
    self
      .get("api.token")
      .map(|t| t.trim().to_string())
      .filter(|t| !t.is_empty())
  }

  pub fn surface(
    &self
  ) -> anyhow::Result<Surface> {
    let raw = self
      .get("surface")
      .unwrap_or_default();
    raw.parse::<Surface>().with_context(
      || {
        format!(
          "invalid surface setting: \
           {raw}"
        )
      }
    )
  }

  pub fn list_limit(
    &self
  ) -> anyhow::Result<u32> {
    let raw = self
      .get("list.limit")
      .unwrap_or_default();
    let limit = raw
      .trim()
      .parse::<u32>()
      .with_context(|| {
        format!(
          "invalid list.limit: {raw}"
        )
      })?;
    if limit == 0 {
      return Err(anyhow!(
        "list.limit must be at least 1"
      ));
    }
    Ok(limit)
  }

  pub fn list_sort(
    &self
  ) -> anyhow::Result<SortKey> {
    let raw = self
      .get("list.sort")
      .unwrap_or_default();
    Ok(raw.parse::<SortKey>()?)
  }

  pub fn list_order(
    &self
  ) -> anyhow::Result<SortOrder> {
    let raw = self
      .get("list.order")
      .unwrap_or_default();
    Ok(raw.parse::<SortOrder>()?)
  }

  #[tracing::instrument(skip(self))]
  fn load_file(
    &mut self,
    path: &Path
  ) -> anyhow::Result<()> {
    let path = expand_tilde(path);
    let text =
      fs::read_to_string(&path)
        .with_context(|| {
          format!(
            "failed to read {}",
            path.display()
          )
        })?;

    self
      .loaded_files
      .push(path.clone());

    let base_dir = path
      .parent()
      .map(|p| p.to_path_buf())
      .unwrap_or_else(|| {
        PathBuf::from(".")
      });

    for (line_num, raw_line) in
      text.lines().enumerate()
    {
      let mut line = raw_line.trim();
      if line.is_empty()
        || line.starts_with('#')
      {
        continue;
      }

      if let Some((before, _)) =
        line.split_once(" #")
      {
        line = before.trim();
      }

      if let Some(include_rest) =
        line.strip_prefix("include ")
      {
        let include_path =
          resolve_include_path(
            &base_dir,
            include_rest.trim()
          )?;
        debug!(
            file = %path.display(),
            include = %include_path.display(),
            line = line_num + 1,
            "processing include"
        );

        if include_path.exists() {
          self
            .load_file(&include_path)?;
        } else {
          warn!(include = %include_path.display(), "include file does not exist; skipping");
        }
        continue;
      }

      let (k, v) = line
        .split_once('=')
        .ok_or_else(|| {
          anyhow!(
            "invalid config line \
             {}:{}: {}",
            path.display(),
            line_num + 1,
            raw_line
          )
        })?;

      let key = k.trim().to_string();
      let value = v.trim().to_string();
      if key == "api.token" {
        trace!(key = %key, "loaded config key");
      } else {
        trace!(key = %key, value = %value, "loaded config key");
      }
      self.map.insert(key, value);
    }

    Ok(())
  }
}

#[tracing::instrument(skip(
  override_path
))]
fn resolve_rc_path(
  override_path: Option<&Path>
) -> anyhow::Result<Option<PathBuf>> {
  if let Some(path) = override_path {
    return Ok(Some(path.to_path_buf()));
  }

  if let Ok(rc_env) =
    std::env::var(RC_ENV_VAR)
  {
    if rc_env == "/dev/null" {
      return Ok(None);
    }
    return Ok(Some(PathBuf::from(
      rc_env
    )));
  }

  let home = dirs::home_dir()
    .ok_or_else(|| {
      anyhow!(
        "cannot determine home \
         directory"
      )
    })?;
  let candidate = home.join(RC_FILE_NAME);
  if candidate.exists() {
    return Ok(Some(candidate));
  }

  Ok(None)
}

fn resolve_include_path(
  base_dir: &Path,
  include: &str
) -> anyhow::Result<PathBuf> {
  if include.trim().is_empty() {
    return Err(anyhow!(
      "include path cannot be empty"
    ));
  }

  let raw = PathBuf::from(include);
  let expanded = expand_tilde(&raw);
  if expanded.is_absolute() {
    Ok(expanded)
  } else {
    Ok(base_dir.join(expanded))
  }
}

fn expand_tilde(
  path: &Path
) -> PathBuf {
  let text = path.to_string_lossy();
  if let Some(rest) =
    text.strip_prefix("~/")
    && let Some(home) = dirs::home_dir()
  {
    return home.join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use std::fs;

  use super::*;

  #[test]
  fn loads_rc_file_with_includes() {
    let dir = tempfile::tempdir().unwrap();
    let extra = dir.path().join("extra.rc");
    fs::write(
      &extra,
      "surface = admin\n"
    )
    .unwrap();
    let main = dir.path().join("main.rc");
    fs::write(
      &main,
      "# dashboard\napi.url = https://api.example.test/v1/ # prod\nlist.limit=20\ninclude extra.rc\n"
    )
    .unwrap();

    let cfg =
      Config::load(Some(&main)).unwrap();
    assert_eq!(
      cfg.api_url().unwrap(),
      "https://api.example.test/v1"
    );
    assert_eq!(cfg.list_limit().unwrap(), 20);
    assert_eq!(
      cfg.surface().unwrap(),
      Surface::Admin
    );
    assert_eq!(cfg.loaded_files.len(), 2);
  }

  #[test]
  fn overrides_strip_rc_prefix() {
    let mut cfg = Config::default();
    cfg.apply_overrides(vec![(
      "rc.list.order".to_string(),
      "desc".to_string()
    )]);
    assert_eq!(
      cfg.list_order().unwrap(),
      SortOrder::Desc
    );
    assert_eq!(
      cfg.list_sort().unwrap(),
      SortKey::DueDate
    );
  }

  #[test]
  fn rejects_malformed_lines_and_zero_limit()
  {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.rc");
    fs::write(&path, "api.url\n").unwrap();
    assert!(Config::load(Some(&path)).is_err());

    let mut cfg = Config::default();
    cfg.apply_overrides(vec![(
      "list.limit".to_string(),
      "0".to_string()
    )]);
    assert!(cfg.list_limit().is_err());
    assert!(cfg.api_url().is_err());
  }
}
