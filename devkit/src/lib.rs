/*!
# Fleetwatch DevKit - Stubs et Utilitaires de test du hub

Bibliothèque facilitant les tests du relais sans socket réel avec:
- Canaux enregistreurs à la place des WebSockets
- Stockage instable injectable (pannes par usine)
- Fixtures d'annuaire et de rapports agents
*/

pub mod channel_stub;
pub mod fixtures;
pub mod store_stub;
pub mod test_utils;

pub use channel_stub::RecordingChannel;
pub use fixtures::{sample_directory, ReportBuilder};
pub use store_stub::FlakyStore;
pub use test_utils::TestHarness;
