use std::env;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use ubcf::{
    EngineConfig, InMemoryRatingStore, QueryOutcome, RawRating, RecommendationRequest,
    Recommender, UserIdValidation,
};

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let triplets = vec![
        (1, "Call of Duty", 5.0), (1, "FIFA", 4.0),
        (2, "Call of Duty", 5.0), (2, "Halo", 4.0), (2, "FIFA", 3.0),
        (3, "Minecraft", 5.0), (3, "Zelda", 4.5),
        (4, "Halo", 2.0), (4, "Zelda", 5.0), (4, "FIFA", 1.0),
        (5, "Call of Duty", 4.0), (5, "Halo", 5.0), (5, "Tetris", 3.0),
    ];

    let ratings: Vec<RawRating> = triplets
        .into_iter()
        .map(|(user, game, rating)| RawRating::new(user, game, rating))
        .collect();
    let store = InMemoryRatingStore::new(ratings).with_known_users(vec![6]);

    let recommender = Recommender::new(EngineConfig::default());
    let report = recommender.ingest_from(&store)?;
    println!("{:?}", report);

    for user in 1..=6 {
        println!("{:?}: {:?}", user, recommender.neighbors(user, 5)?);
    }

    let requested: Vec<String> = env::args().skip(1).collect();
    let inputs = if requested.is_empty() {
        (1..=6).map(|user| user.to_string()).collect()
    } else {
        requested
    };

    for input in inputs {
        let user_id = match recommender.validate_user_id(&input)? {
            UserIdValidation::Valid(user_id) => user_id,
            UserIdValidation::Invalid(reason) => {
                println!("\n{:?}: {:?}", input, reason);
                continue;
            }
        };

        match recommender.recommend(&RecommendationRequest::new(user_id))? {
            QueryOutcome::Ranked(entries) => {
                println!("\nTop recommendations for user {}:", user_id);
                for entry in entries {
                    println!("  {}", entry);
                }
            }
            QueryOutcome::NoRecommendations(reason) => {
                println!("\nNo new recommendations for user {} ({:?})", user_id, reason);
            }
            QueryOutcome::UnknownUser(user_id) => {
                println!("\nUnknown user {}", user_id);
            }
        }
    }

    Ok(())
}
