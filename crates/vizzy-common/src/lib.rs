//! Client-side domain logic shared by the Vizzy server and CLI.
//!
//! | Module     | Responsibility                                             |
//! |------------|------------------------------------------------------------|
//! | `identity` | Encode/decode `CITY-TYPE-NN-NNN-Name` project names        |
//! | `wizard`   | Step-by-step capture of a new project's identity           |
//! | `ordering` | Live drag-reorder of projects and images                   |
//! | `view`     | Sidebar filter/search/theme store                          |
//! | `storage`  | Quota usage levels and byte formatting                     |

pub mod identity;
pub mod ordering;
pub mod storage;
pub mod view;
pub mod wizard;

pub use identity::{City, DecodedName, ProjectIdentity, ProjectNumber, ProjectType, RenameSession};
pub use ordering::{OrderEntry, Ordered, OrderedList};
pub use wizard::{Step, Transition, Wizard, WizardEvent};
