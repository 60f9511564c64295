/**
 * FLEETWATCH HUB - Relais temps réel de la flotte d'agents MES
 *
 * RÔLE : Exposer le coeur du hub (sessions, canaux, diffusion, réconciliation,
 * dispatch ciblé) au binaire et aux crates de test.
 */

pub mod aggregation;
pub mod broadcast;
pub mod channels;
pub mod config;
pub mod dispatch;
pub mod health;
pub mod http;
pub mod hub;
pub mod lifecycle;
pub mod models;
pub mod reconciler;
pub mod reset;
pub mod sessions;
pub mod store;
pub mod ws;

pub use channels::{ChannelId, Frame, FrameSender, InboundEvent};
pub use config::HubConfig;
pub use hub::Hub;
pub use lifecycle::{CloseSummary, Connection};
pub use store::{FleetStore, JsonFleetStore, SharedStore, StoreError};
