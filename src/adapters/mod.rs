//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter       | Implements                    | Connects to               |
//! |---------------|-------------------------------|---------------------------|
//! | `config_file` | ConfigPort                    | JSON file on disk         |
//! | `ledger`      | ReportSink                    | Ledger lines + fault ring |
//! | `log_sink`    | EventSink                     | `log` facade              |
//! | `sim`         | ActuatorPort, ClassifierPort  | Scripted conveyor         |
//! |               | MotorPort, TelemetryPort      | Scripted drive bus        |
//! | `store`       | StoragePort                   | Memory / directory tree   |
//! | `time`        | ClockPort                     | `std::time::Instant`      |

pub mod config_file;
pub mod ledger;
pub mod log_sink;
pub mod sim;
pub mod store;
pub mod time;
