//! Machine credentials from a netrc file.
//!
//! Only the parts of the format that matter for proxy authentication are
//! understood: `machine`, `default`, `login`, `password` and `macdef`
//! (whose body is skipped up to the next blank line). `account` values are
//! read and ignored.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised while loading a netrc file.
#[derive(Debug, Error)]
pub enum NetrcError {
    #[error("failed to read netrc file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid netrc {}: duplicate {field} for machine `{machine}`", path.display())]
    DuplicateField {
        path: PathBuf,
        machine: String,
        field: &'static str,
    },

    #[error("invalid netrc {}: duplicate machine `{machine}`", path.display())]
    DuplicateMachine { path: PathBuf, machine: String },

    #[error("no netrc location: NETRC is unset and no home directory was found")]
    NoLocation,
}

/// Login and password for one host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub login: String,
    pub password: String,
}

/// Credential lookup by request host.
pub trait MachineLookup: Send + Sync {
    fn credentials(&self, host: &str) -> Option<&Credentials>;
}

/// Parsed netrc entries keyed by machine name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Machines {
    machines: HashMap<String, Credentials>,
    default: Option<Credentials>,
}

#[derive(Default)]
struct Entry {
    machine: Option<String>,
    is_default: bool,
    login: Option<String>,
    password: Option<String>,
}

impl Machines {
    /// Load a netrc file from disk.
    pub fn load(path: &Path) -> Result<Self, NetrcError> {
        let content = std::fs::read_to_string(path).map_err(|source| NetrcError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(path, &content)
    }

    /// Parse netrc content. `path` is only used in error messages.
    pub fn parse(path: &Path, content: &str) -> Result<Self, NetrcError> {
        let mut machines = Machines::default();
        let mut entry = Entry::default();
        let mut in_macro = false;

        for line in content.lines() {
            if in_macro {
                if line.trim().is_empty() {
                    in_macro = false;
                }
                continue;
            }

            let mut tokens = line.split_whitespace();
            while let Some(token) = tokens.next() {
                match token {
                    "machine" => {
                        machines.commit(path, std::mem::take(&mut entry))?;
                        entry.machine = tokens.next().map(str::to_string);
                    }
                    "default" => {
                        machines.commit(path, std::mem::take(&mut entry))?;
                        entry.is_default = true;
                    }
                    "login" => {
                        let value = tokens.next().unwrap_or_default().to_string();
                        if entry.login.replace(value).is_some() {
                            return Err(entry.duplicate(path, "login"));
                        }
                    }
                    "password" => {
                        let value = tokens.next().unwrap_or_default().to_string();
                        if entry.password.replace(value).is_some() {
                            return Err(entry.duplicate(path, "password"));
                        }
                    }
                    "account" => {
                        tokens.next();
                    }
                    "macdef" => {
                        in_macro = true;
                        break;
                    }
                    _ => {}
                }
            }
        }
        machines.commit(path, entry)?;

        Ok(machines)
    }

    /// Find the credentials configured for `host`.
    ///
    /// `host` may carry a port; an exact `host:port` entry wins over the bare
    /// host name, which wins over the `default` entry.
    pub fn get(&self, host: &str) -> Option<&Credentials> {
        self.machines
            .get(host)
            .or_else(|| {
                let bare = host.rsplit_once(':').map(|(h, _)| h)?;
                self.machines.get(bare)
            })
            .or(self.default.as_ref())
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty() && self.default.is_none()
    }

    fn commit(&mut self, path: &Path, entry: Entry) -> Result<(), NetrcError> {
        let (Some(login), Some(password)) = (entry.login, entry.password) else {
            return Ok(());
        };
        let credentials = Credentials { login, password };

        if entry.is_default {
            self.default = Some(credentials);
            return Ok(());
        }
        let Some(machine) = entry.machine else {
            return Ok(());
        };
        if self.machines.contains_key(&machine) {
            return Err(NetrcError::DuplicateMachine {
                path: path.to_path_buf(),
                machine,
            });
        }
        self.machines.insert(machine, credentials);
        Ok(())
    }
}

impl Entry {
    fn duplicate(&self, path: &Path, field: &'static str) -> NetrcError {
        let machine = if self.is_default {
            "default".to_string()
        } else {
            self.machine.clone().unwrap_or_default()
        };
        NetrcError::DuplicateField {
            path: path.to_path_buf(),
            machine,
            field,
        }
    }
}

impl MachineLookup for Machines {
    fn credentials(&self, host: &str) -> Option<&Credentials> {
        self.get(host)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<Machines, NetrcError> {
        Machines::parse(Path::new("test.netrc"), content)
    }

    #[test]
    fn test_read_simple_netrc() {
        let machines = parse("machine proxy.example.com login username password password\n").unwrap();

        assert_eq!(machines.len(), 1);
        assert_eq!(
            machines.get("proxy.example.com"),
            Some(&Credentials {
                login: "username".to_string(),
                password: "password".to_string(),
            })
        );
        assert!(machines.get("other.example.com").is_none());
    }

    #[test]
    fn test_multiline_entries() {
        let machines = parse(
            "machine a.example\n  login alice\n  password secret\n\nmachine b.example\n  login bob\n  password hunter2\n",
        )
        .unwrap();

        assert_eq!(machines.len(), 2);
        assert_eq!(machines.get("b.example").unwrap().login, "bob");
    }

    #[test]
    fn test_duplicate_login_for_one_machine() {
        let err = parse("machine a.example login one login two password p\n").unwrap_err();
        assert!(matches!(err, NetrcError::DuplicateField { field: "login", .. }));
    }

    #[test]
    fn test_duplicate_password_for_one_machine() {
        let err = parse("machine a.example\npassword p1\npassword p2\nlogin l\n").unwrap_err();
        assert!(matches!(err, NetrcError::DuplicateField { field: "password", .. }));
    }

    #[test]
    fn test_duplicate_machine() {
        let err = parse(
            "machine a.example login l password p\nmachine a.example login l2 password p2\n",
        )
        .unwrap_err();
        assert!(matches!(err, NetrcError::DuplicateMachine { .. }));
    }

    #[test]
    fn test_macdef_body_is_skipped() {
        let machines = parse(
            "macdef init\nmachine evil.example login x password y\n\nmachine good.example login l password p\n",
        )
        .unwrap();

        assert!(machines.get("evil.example").is_none());
        assert!(machines.get("good.example").is_some());
    }

    #[test]
    fn test_port_and_default_fallback() {
        let machines = parse(
            "machine proxy.example login l password p\ndefault login anon password guest\n",
        )
        .unwrap();

        assert_eq!(machines.get("proxy.example:8443").unwrap().login, "l");
        assert_eq!(machines.get("elsewhere.example").unwrap().login, "anon");
    }

    #[test]
    fn test_missing_file() {
        let err = Machines::load(Path::new("/nonexistent/.netrc")).unwrap_err();
        assert!(matches!(err, NetrcError::Io { .. }));
    }
}
