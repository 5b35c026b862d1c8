//! swarmscale-swarm: Docker Swarm as the orchestrator.
//!
//! Talks to the Docker Engine API of a swarm manager over its Unix socket
//! or a TCP endpoint, one HTTP/1 connection per request.
//!
//! | Capability | Engine API call |
//! |---|---|
//! | `find_service` | `GET /services?filters={"name":[..]}` |
//! | `replica_count` | `GET /services/{id}` |
//! | `set_replica_count` | `GET /services/{id}` then `POST /services/{id}/update?version=N` |
//!
//! Updates rewrite only `Spec.Mode.Replicated.Replicas`; the rest of the
//! service spec is sent back untouched.

pub mod client;

pub use client::{DockerSwarm, Endpoint};
