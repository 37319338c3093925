// Criterion benchmarks for property matching

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use property_match::core::{
    filters::filter_eligible,
    requirements::resolve,
    scoring::calculate_match_score,
    Matcher,
};
use property_match::models::{
    Availability, BuyerRequirement, Lead, ListingType, PropertyCandidate, PropertyStatus, PropertyType,
    RequirementOrigin, ScoringConfig, Tolerances,
};
use std::collections::HashSet;

const CITIES: [&str; 4] = ["Lisboa", "Porto", "Sintra", "Cascais"];

fn create_candidate(id: usize) -> PropertyCandidate {
    PropertyCandidate {
        id: id.to_string(),
        title: format!("Property {}", id),
        listing_type: if id % 5 == 0 { ListingType::Rent } else { ListingType::Sale },
        price: 150_000.0 + (id % 40) as f64 * 10_000.0,
        property_type: if id % 3 == 0 { PropertyType::House } else { PropertyType::Apartment },
        city: CITIES[id % CITIES.len()].to_string(),
        state: "Portugal".to_string(),
        address: format!("Rua {}", id),
        bedrooms: if id % 7 == 0 { None } else { Some(1 + (id % 4) as u32) },
        bathrooms: Some(1 + (id % 2) as u32),
        usable_area: Some(50.0 + (id % 10) as f64 * 15.0),
        status: PropertyStatus::Active,
        availability: Availability::Available,
    }
}

fn create_requirement() -> BuyerRequirement {
    BuyerRequirement {
        budget_min: Some(200_000.0),
        budget_max: Some(400_000.0),
        locations: ["lisboa".to_string(), "cascais".to_string()].into_iter().collect(),
        bedrooms_min: Some(2),
        area_min: Some(70.0),
        origin: RequirementOrigin::Profile,
        ..Default::default()
    }
}

fn bench_resolve(c: &mut Criterion) {
    let lead = Lead {
        id: "lead".to_string(),
        location: Some("Lisboa".to_string()),
        budget: Some(300_000.0),
        property_interest: Some("Apartamento T3 com garagem".to_string()),
        transaction_type: Some("compra".to_string()),
        ..Default::default()
    };

    c.bench_function("resolve_lead_requirement", |b| {
        b.iter(|| resolve(black_box(Some(&lead)), None));
    });
}

fn bench_scoring(c: &mut Criterion) {
    let requirement = create_requirement();
    let candidate = create_candidate(42);
    let config = ScoringConfig::default();

    c.bench_function("calculate_match_score", |b| {
        b.iter(|| calculate_match_score(black_box(&requirement), black_box(&candidate), &config));
    });
}

fn bench_matching(c: &mut Criterion) {
    let matcher = Matcher::default();
    let requirement = create_requirement();
    let saved = HashSet::new();

    let mut group = c.benchmark_group("matching");

    for candidate_count in [10, 100, 1000, 5000].iter() {
        let inventory: Vec<PropertyCandidate> = (0..*candidate_count).map(create_candidate).collect();

        group.bench_with_input(
            BenchmarkId::new("find_matches", candidate_count),
            candidate_count,
            |b, _| {
                b.iter(|| {
                    matcher.find_matches(
                        black_box(&requirement),
                        black_box(&inventory),
                        black_box(10),
                        &saved,
                    )
                });
            },
        );
    }

    group.finish();
}

fn bench_filtering(c: &mut Criterion) {
    let requirement = create_requirement();
    let tolerances = Tolerances::default();
    let inventory: Vec<PropertyCandidate> = (0..1000).map(create_candidate).collect();

    c.bench_function("filter_eligible_1000_candidates", |b| {
        b.iter(|| black_box(filter_eligible(black_box(&requirement), &inventory, &tolerances)));
    });
}

criterion_group!(
    benches,
    bench_resolve,
    bench_scoring,
    bench_matching,
    bench_filtering
);

criterion_main!(benches);
