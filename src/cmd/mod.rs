//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled                      |
//! |------------|---------------------------------------|
//! | `server`   | `Serve`, `Init`                       |
//! | `wizard`   | `New`                                 |
//! | `projects` | `List`, `Rename`, `Projects`          |
//! | `images`   | `Images`                              |
//! | `storage`  | `Storage`                             |

pub mod images;
pub mod projects;
pub mod server;
pub mod storage;
pub mod wizard;

pub use images::cmd_images;
pub use projects::{cmd_list, cmd_projects, cmd_rename};
pub use server::{cmd_init, cmd_serve};
pub use storage::cmd_storage;
pub use wizard::{WizardAnswers, cmd_new};
