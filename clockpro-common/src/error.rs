// Copyright 2026 clockpro Project Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

/// Cache error.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Config error.
    #[error("config error: {0}")]
    Config(String),
}

impl Error {
    /// Create a config error with the given reason.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config(reason.into())
    }
}

/// Cache result.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::config("hot_ratio must be in 0.0..=1.0, given: 2");
        assert_eq!(e.to_string(), "config error: hot_ratio must be in 0.0..=1.0, given: 2");
    }

    #[test]
    fn test_error_is_std_error() {
        fn is_error<E: std::error::Error + Send + Sync + 'static>() {}
        is_error::<Error>();
    }
}
