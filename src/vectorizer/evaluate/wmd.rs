use std::sync::mpsc;
use std::thread;

use ndarray::Array2;
use rayon::prelude::*;
use rayon::ThreadPoolBuilder;
use tracing::{debug, error, info, warn};

use crate::error::{Error, Result};
use crate::utils::math::vector::math::Norm;
use crate::vectorizer::embedding::EmbeddingMatrix;
use crate::vectorizer::encoder::Document;

/// 残量がこれ以下なら流し切ったとみなす
const MASS_EPSILON: f64 = 1e-12;

/// Earth mover's distance between two histograms over the same points.
///
/// Solved exactly as a min-cost flow (successive shortest paths, Dijkstra with
/// potentials). Both histograms are expected to carry the same total mass.
///
/// # Arguments
/// * `supply` - mass at each point on the first side
/// * `demand` - mass at each point on the second side
/// * `cost` - ground distance between points, `supply.len() x demand.len()`
///
/// # Returns
/// * `f64` - total transport cost of an optimal flow
pub fn emd(supply: &[f64], demand: &[f64], cost: &Array2<f64>) -> f64 {
    debug_assert_eq!(cost.dim(), (supply.len(), demand.len()));
    let (m, k) = (supply.len(), demand.len());
    // node layout: source | supply 1..=m | demand m+1..=m+k | sink
    let source = 0;
    let sink = m + k + 1;
    let nodes = m + k + 2;
    let demand_node = |j: usize| m + 1 + j;

    let mut sent = vec![0.0_f64; m];
    let mut received = vec![0.0_f64; k];
    let mut flow = Array2::<f64>::zeros((m, k));
    let mut potential = vec![0.0_f64; nodes];

    loop {
        let mut dist = vec![f64::INFINITY; nodes];
        let mut prev = vec![usize::MAX; nodes];
        let mut done = vec![false; nodes];
        dist[source] = 0.0;

        loop {
            let mut u = usize::MAX;
            let mut best = f64::INFINITY;
            for v in 0..nodes {
                if !done[v] && dist[v] < best {
                    best = dist[v];
                    u = v;
                }
            }
            if u == usize::MAX {
                break;
            }
            done[u] = true;
            let mut relax = |v: usize, edge_cost: f64| {
                let reduced = (edge_cost + potential[u] - potential[v]).max(0.0);
                if dist[u] + reduced < dist[v] {
                    dist[v] = dist[u] + reduced;
                    prev[v] = u;
                }
            };
            if u == source {
                for i in 0..m {
                    if supply[i] - sent[i] > MASS_EPSILON {
                        relax(1 + i, 0.0);
                    }
                }
            } else if u == sink {
                for j in 0..k {
                    if received[j] > MASS_EPSILON {
                        relax(demand_node(j), 0.0);
                    }
                }
            } else if u <= m {
                let i = u - 1;
                for j in 0..k {
                    relax(demand_node(j), cost[[i, j]]);
                }
                if sent[i] > MASS_EPSILON {
                    relax(source, 0.0);
                }
            } else {
                let j = u - m - 1;
                for i in 0..m {
                    if flow[[i, j]] > MASS_EPSILON {
                        relax(1 + i, -cost[[i, j]]);
                    }
                }
                if demand[j] - received[j] > MASS_EPSILON {
                    relax(sink, 0.0);
                }
            }
        }

        if !dist[sink].is_finite() {
            break;
        }
        for v in 0..nodes {
            potential[v] += dist[v].min(dist[sink]);
        }

        // 経路上の残余容量の最小値
        let mut bottleneck = f64::INFINITY;
        let mut v = sink;
        while v != source {
            let u = prev[v];
            let capacity = residual(u, v, m, supply, demand, &sent, &received, &flow);
            bottleneck = bottleneck.min(capacity);
            v = u;
        }
        if bottleneck <= MASS_EPSILON {
            break;
        }

        let mut v = sink;
        while v != source {
            let u = prev[v];
            if u == source {
                sent[v - 1] += bottleneck;
            } else if v == source {
                sent[u - 1] -= bottleneck;
            } else if v == sink {
                received[u - m - 1] += bottleneck;
            } else if u == sink {
                received[v - m - 1] -= bottleneck;
            } else if u <= m {
                flow[[u - 1, v - m - 1]] += bottleneck;
            } else {
                flow[[v - 1, u - m - 1]] -= bottleneck;
            }
            v = u;
        }
    }

    flow.iter()
        .zip(cost.iter())
        .map(|(f, c)| f * c)
        .sum()
}

/// residual capacity of the edge `u -> v` in the transport network
#[allow(clippy::too_many_arguments)]
fn residual(
    u: usize,
    v: usize,
    m: usize,
    supply: &[f64],
    demand: &[f64],
    sent: &[f64],
    received: &[f64],
    flow: &Array2<f64>,
) -> f64 {
    let sink = m + demand.len() + 1;
    if u == 0 {
        supply[v - 1] - sent[v - 1]
    } else if v == 0 {
        sent[u - 1]
    } else if v == sink {
        demand[u - m - 1] - received[u - m - 1]
    } else if u == sink {
        received[v - m - 1]
    } else if u <= m {
        f64::INFINITY
    } else {
        flow[[v - 1, u - m - 1]]
    }
}

/// Inverse word mover's distance between two documents.
///
/// Both documents are L1-normalized and compared over the union of their
/// terms, with euclidean distances between term embeddings as ground cost.
///
/// # Returns
/// * `0.0` if the documents share no term (or either has no mass)
/// * `f64::INFINITY` if the distance is exactly zero
/// * `1 / distance` otherwise
pub fn inverse_wmd(query: &Document, collection: &Document, embeddings: &EmbeddingMatrix) -> f64 {
    if !query.indices().iter().any(|&id| collection.contains(id)) {
        return 0.0;
    }
    let query = query.clone().unit(Norm::L1);
    let collection = collection.clone().unit(Norm::L1);
    if query.is_empty() || collection.is_empty() {
        return 0.0;
    }

    let mut terms: Vec<usize> = query.indices().iter().chain(collection.indices()).copied().collect();
    terms.sort_unstable();
    terms.dedup();
    let distances = embeddings.euclidean_distances(&terms);
    let position = |id: usize| terms.binary_search(&id).unwrap_or_default();

    let supply_at: Vec<usize> = collection.indices().iter().map(|&id| position(id)).collect();
    let demand_at: Vec<usize> = query.indices().iter().map(|&id| position(id)).collect();
    let cost = Array2::from_shape_fn((supply_at.len(), demand_at.len()), |(i, j)| {
        distances[[supply_at[i], demand_at[j]]]
    });

    let distance = emd(collection.values(), query.values(), &cost);
    if distance == 0.0 {
        f64::INFINITY
    } else {
        1.0 / distance
    }
}

/// Inverse word mover's distances for every (query, collection document) pair.
///
/// Pairs are solved independently on a worker pool of `num_workers` threads
/// that lives for this call only. Each result carries its own coordinates and
/// is committed into the preallocated matrix as it arrives.
///
/// # Returns
/// * `Array2<f64>` - shape `(queries.len(), collection.len())`
pub fn inverse_wmd_matrix(
    queries: &[Document],
    collection: &[Document],
    embeddings: &EmbeddingMatrix,
    num_workers: usize,
) -> Result<Array2<f64>> {
    let (rows, cols) = (queries.len(), collection.len());
    let mut similarities = Array2::<f64>::zeros((rows, cols));
    if rows == 0 || cols == 0 {
        return Ok(similarities);
    }
    let pool = ThreadPoolBuilder::new().num_threads(num_workers).build()?;
    info!(
        "Computing {} word mover's distances on {} workers.",
        rows * cols,
        pool.current_num_threads()
    );

    let (tx, rx) = mpsc::channel::<(usize, usize, f64)>();
    let (filled, workers_finished) = thread::scope(|scope| {
        let workers = scope.spawn(move || {
            pool.install(|| {
                (0..rows * cols).into_par_iter().for_each_with(tx, |tx, pair| {
                    let (row, col) = (pair / cols, pair % cols);
                    let value = inverse_wmd(&queries[row], &collection[col], embeddings);
                    // a lost send shows up as a missing cell below
                    if tx.send((row, col, value)).is_err() {
                        warn!("Dropped word mover's similarity at ({}, {}).", row, col);
                    }
                });
            });
        });
        // 完了順で届くので座標どおりに書き込む
        let mut filled = 0usize;
        for (row, col, value) in rx {
            similarities[[row, col]] = value;
            filled += 1;
        }
        (filled, workers.join().is_ok())
    });
    let expected = rows * cols;
    if !workers_finished || filled != expected {
        error!("Word mover's workers stopped after {} of {} pairs.", filled, expected);
        return Err(Error::IncompleteResults { expected, filled });
    }
    debug!("Collected {} word mover's similarities.", filled);
    Ok(similarities)
}
