//! Stress and Batch Tests
//!
//! These tests verify behavior on large and mixed workloads:
//! - Long trials (tens of thousands of samples)
//! - Batch processing of many independent series
//! - Mixed batches with failing members
//! - Concurrent readers of processed series

use markwrite_signal::analysis::smoothing::KernelChoice;
use markwrite_signal::analysis::StrokeSegmenter;
use markwrite_signal::{Error, Sample, Series, SeriesProcessor};
use std::sync::Arc;
use std::thread;
use std::time::Instant;

// =============================================================================
// Test Helpers
// =============================================================================

/// Cursive-like trace at 200 Hz, pen lifted for 40 of every 200 samples
fn cursive_trace(count: usize, seed: f64) -> Vec<Sample> {
    (0..count)
        .map(|i| {
            let phase = i as f64 * 0.07 + seed;
            let x = i as f64 * 0.25 + 8.0 * phase.cos();
            let y = 30.0 + 12.0 * (phase * 1.7).sin();
            let pressure = if i % 200 < 160 { 0.5 + 0.2 * phase.sin().abs() } else { 0.0 };
            Sample::new(i as f64 * 0.005, x, y, pressure)
        })
        .collect()
}

// =============================================================================
// Test 1: Long trial
// =============================================================================

#[test]
fn test_long_trial() {
    let count = 50_000;
    let mut series = Series::new(cursive_trace(count, 0.0)).unwrap();

    let start = Instant::now();
    let outcome = SeriesProcessor::default().process(&mut series).unwrap();
    let elapsed = start.elapsed();

    assert_eq!(outcome.samples, count);
    assert_eq!(outcome.filter_kernel, KernelChoice::Full { window: 13, order: 9 });

    let derived = series.derived().unwrap();
    assert!(derived.is_aligned_with(count));
    assert!(derived.xy_velocity.iter().all(|v| v.is_finite()));
    assert!(derived.x_filtered.iter().all(|v| v.is_finite()));

    let seg = StrokeSegmenter::new().analyze(&series).unwrap();
    assert_eq!(seg.pressed_runs.len(), count / 200);
    assert_eq!(seg.sample_runs.len(), 1);

    println!("Processed {} samples in {:?}", count, elapsed);
}

// =============================================================================
// Test 2: Batch processing
// =============================================================================

#[test]
fn test_batch_matches_sequential() {
    let processor = SeriesProcessor::default();
    let mut batch: Vec<Series> = (0..24)
        .map(|i| Series::new(cursive_trace(500 + i * 37, i as f64)).unwrap())
        .collect();
    let mut sequential = batch.clone();

    let results = processor.process_batch(&mut batch);
    assert_eq!(results.len(), 24);

    for (series, result) in sequential.iter_mut().zip(&results) {
        let expected = processor.process(series).unwrap();
        assert_eq!(result.as_ref().unwrap(), &expected);
    }
    for (parallel, serial) in batch.iter().zip(&sequential) {
        assert_eq!(parallel.derived(), serial.derived());
    }
}

#[test]
fn test_batch_with_failing_member() {
    let processor = SeriesProcessor::default();
    let mut batch = vec![
        Series::new(cursive_trace(100, 0.0)).unwrap(),
        Series::empty(),
        Series::new(cursive_trace(7, 1.0)).unwrap(),
    ];

    let results = processor.process_batch(&mut batch);
    assert!(results[0].is_ok());
    assert!(matches!(results[1], Err(Error::EmptyInput(_))));
    assert_eq!(results[2].as_ref().unwrap().filter_kernel, KernelChoice::Unsmoothed);

    // the failing series is left untouched, the others are processed
    assert!(batch[0].derived().is_some());
    assert!(batch[1].derived().is_none());
    assert!(batch[2].derived().is_some());
}

#[test]
fn test_empty_batch() {
    let results = SeriesProcessor::default().process_batch(&mut []);
    assert!(results.is_empty());
}

// =============================================================================
// Test 3: Concurrent readers
// =============================================================================

#[test]
fn test_concurrent_segmentation_readers() {
    let mut series = Series::new(cursive_trace(5_000, 0.5)).unwrap();
    SeriesProcessor::default().process(&mut series).unwrap();
    let series = Arc::new(series);
    let expected = StrokeSegmenter::new().analyze(&series).unwrap();

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let series = Arc::clone(&series);
            thread::spawn(move || StrokeSegmenter::new().analyze(&series).unwrap())
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), expected);
    }
}
