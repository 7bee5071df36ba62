// SPDX-License-Identifier: MPL-2.0

mod session;
pub mod settings;

pub use session::{KeyStore, SessionError};
pub use settings::{AppSettings, SettingsError};
