//! Typed reads of INI section properties
use nnini::IniSection;
use std::str::FromStr;

use crate::error::{NetError, Result};

/// Read-only view over one section. Empty values count as absent.
pub(crate) struct Props<'a> {
    section: &'a IniSection,
}

impl<'a> Props<'a> {
    pub fn new(section: &'a IniSection) -> Self {
        Self { section }
    }

    pub fn name(&self) -> &'a str {
        &self.section.name
    }

    pub fn str(&self, key: &str) -> Option<&'a str> {
        self.section.get(key).filter(|v| !v.is_empty())
    }

    pub fn required(&self, key: &str) -> Result<&'a str> {
        self.str(key).ok_or_else(|| {
            NetError::property(self.name(), format!("missing required property '{}'", key))
        })
    }

    /// Reject keys outside `allowed`
    pub fn check_known(&self, allowed: &[&[&str]]) -> Result<()> {
        for key in self.section.keys() {
            if !allowed.iter().any(|group| group.contains(&key)) {
                return Err(NetError::property(
                    self.name(),
                    format!("unknown property '{}'", key),
                ));
            }
        }
        Ok(())
    }

    pub fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>> {
        match self.str(key) {
            None => Ok(None),
            Some(raw) => raw.parse::<T>().map(Some).map_err(|_| {
                NetError::property(self.name(), format!("invalid value '{}' for '{}'", raw, key))
            }),
        }
    }

    /// Strictly positive integer
    pub fn positive(&self, key: &str) -> Result<Option<usize>> {
        match self.parse::<usize>(key)? {
            Some(0) => Err(NetError::property(
                self.name(),
                format!("'{}' must be greater than zero", key),
            )),
            other => Ok(other),
        }
    }

    pub fn bool(&self, key: &str) -> Result<Option<bool>> {
        match self.str(key) {
            None => Ok(None),
            Some(raw) => match raw.to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(Some(true)),
                "false" | "no" | "off" | "0" => Ok(Some(false)),
                _ => Err(NetError::property(
                    self.name(),
                    format!("invalid boolean '{}' for '{}'", raw, key),
                )),
            },
        }
    }

    /// `"3"` or `"3,5"` as (height, width)
    pub fn pair(&self, key: &str) -> Result<Option<(usize, usize)>> {
        let Some(raw) = self.str(key) else {
            return Ok(None);
        };
        let values = self.numbers(key, raw, ',')?;
        match values.as_slice() {
            [v] => Ok(Some((*v, *v))),
            [h, w] => Ok(Some((*h, *w))),
            _ => Err(NetError::property(
                self.name(),
                format!("'{}' expects one or two values, got '{}'", key, raw),
            )),
        }
    }

    /// `"c:h:w"` or `"b:c:h:w"`; the batch component, when present, is returned
    /// separately.
    pub fn shape(&self, key: &str) -> Result<Option<(Option<usize>, [usize; 3])>> {
        let Some(raw) = self.str(key) else {
            return Ok(None);
        };
        let values = self.numbers(key, raw, ':')?;
        if values.contains(&0) {
            return Err(NetError::property(
                self.name(),
                format!("'{}' has a zero dimension: '{}'", key, raw),
            ));
        }
        match values.as_slice() {
            [c, h, w] => Ok(Some((None, [*c, *h, *w]))),
            [b, c, h, w] => Ok(Some((Some(*b), [*c, *h, *w]))),
            _ => Err(NetError::property(
                self.name(),
                format!("'{}' expects c:h:w or b:c:h:w, got '{}'", key, raw),
            )),
        }
    }

    /// Comma separated names, trimmed
    pub fn list(&self, key: &str) -> Vec<String> {
        self.str(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn numbers(&self, key: &str, raw: &str, sep: char) -> Result<Vec<usize>> {
        raw.split(sep)
            .map(|part| {
                part.trim().parse::<usize>().map_err(|_| {
                    NetError::property(
                        self.name(),
                        format!("invalid value '{}' for '{}'", raw, key),
                    )
                })
            })
            .collect()
    }
}
