//! Concurrent load generator against the upsert endpoints.
//!
//! Each virtual user posts single-item batches with a random code, one after
//! the other, and counts how many came back `201 Created`.

use std::time::Instant;

use rand::Rng;
use serde::Serialize;
use tokio::task::JoinSet;

use stockroom_core::record::{Record, UpsertInput};
use stockroom_core::service::UpsertPolicy;

use super::StockroomClient;
use crate::error::{ClientError, Result};

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Load test parameters.
#[derive(Debug, Clone, Copy)]
pub struct LoadTest {
    pub policy: UpsertPolicy,
    /// Concurrent virtual users.
    pub vus: usize,
    /// Requests per virtual user.
    pub iterations: usize,
}

/// Aggregated outcome of a load test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub requests: usize,
    pub created: usize,
    pub failed: usize,
    pub elapsed_ms: u128,
    pub max_latency_ms: u128,
}

impl LoadReport {
    fn merge(&mut self, other: &LoadReport) {
        self.requests += other.requests;
        self.created += other.created;
        self.failed += other.failed;
        self.max_latency_ms = self.max_latency_ms.max(other.max_latency_ms);
    }
}

/// Random uppercase code of `len` letters.
pub fn random_code(len: usize) -> String {
    let mut rng = rand::rng();
    (0..len)
        .map(|_| CODE_ALPHABET[rng.random_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

impl StockroomClient {
    /// Runs `test` against the upsert endpoint of `R`.
    pub async fn load_test<R: Record>(&self, test: LoadTest) -> Result<LoadReport> {
        if test.vus == 0 || test.iterations == 0 {
            return Err(ClientError::InvalidInput(
                "vus and iterations must be at least 1".to_string(),
            ));
        }

        let started = Instant::now();
        let mut users = JoinSet::new();

        for _ in 0..test.vus {
            let client = self.clone();
            users.spawn(async move { client.virtual_user::<R>(test).await });
        }

        let mut report = LoadReport::default();
        while let Some(joined) = users.join_next().await {
            match joined {
                Ok(user) => report.merge(&user),
                Err(e) => {
                    return Err(ClientError::InvalidInput(format!(
                        "virtual user crashed: {e}"
                    )))
                }
            }
        }
        report.elapsed_ms = started.elapsed().as_millis();

        Ok(report)
    }

    async fn virtual_user<R: Record>(&self, test: LoadTest) -> LoadReport {
        let mut report = LoadReport::default();

        for _ in 0..test.iterations {
            let inputs = [UpsertInput::create(random_code(5))];
            let started = Instant::now();
            let result = self.upsert::<R>(test.policy, &inputs).await;
            let latency = started.elapsed();

            report.requests += 1;
            report.max_latency_ms = report.max_latency_ms.max(latency.as_millis());
            match result {
                Ok(_) => report.created += 1,
                Err(e) => {
                    report.failed += 1;
                    eprintln!("{} upsert failed after {}ms: {e}", R::KIND, latency.as_millis());
                }
            }
        }

        report
    }
}
