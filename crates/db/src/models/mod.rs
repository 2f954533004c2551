/// Fixed string-valued domain enumeration. The wire value of every variant is
/// spelled out explicitly because several of them contain spaces.
macro_rules! domain_enum {
    (
        $(#[$meta:meta])*
        pub enum $name:ident {
            $($variant:ident => $value:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $value)]
                $variant,
            )+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($value => Ok($name::$variant),)+
                    other => Err(format!("unknown {} '{}'", stringify!($name), other)),
                }
            }
        }

        impl From<$name> for bson::Bson {
            fn from(value: $name) -> Self {
                bson::Bson::String(value.as_str().to_string())
            }
        }
    };
}

pub(crate) use domain_enum;

pub mod activity;
pub mod customer;
pub mod lead;
pub mod leave;
pub mod notification;
pub mod target;
pub mod task;
pub mod user;

pub use activity::{Activity, ActivityChange, ActivityKind};
pub use customer::Customer;
pub use lead::{CallStatus, EnquireSource, EnquireStatus, Lead, LeadType, Purpose};
pub use leave::{Leave, LeaveStatus};
pub use notification::Notification;
pub use target::Target;
pub use task::{Task, TaskCategory};
pub use user::{Privilege, SecondPrivilege, User};
