//! Static coin catalog.
//!
//! The dataset ships with the binary. The picker surface gets a shuffled
//! copy; round starts draw a single random coin.

use rand::RngExt;
use rand::seq::SliceRandom;

use crate::room::Coin;

/// (name, image path) for every coin in the dataset.
const COINS: &[(&str, &str)] = &[
    ("US Penny", "/coins/us-penny.png"),
    ("US Nickel", "/coins/us-nickel.png"),
    ("US Dime", "/coins/us-dime.png"),
    ("US Quarter", "/coins/us-quarter.png"),
    ("US Half Dollar", "/coins/us-half-dollar.png"),
    ("Sacagawea Dollar", "/coins/sacagawea-dollar.png"),
    ("1 Euro", "/coins/euro-1.png"),
    ("2 Euro", "/coins/euro-2.png"),
    ("UK One Pound", "/coins/uk-pound.png"),
    ("UK 50 Pence", "/coins/uk-50p.png"),
    ("Canadian Loonie", "/coins/ca-loonie.png"),
    ("500 Yen", "/coins/jp-500-yen.png"),
];

/// Coin shown if a room somehow enters memorize without an assignment.
pub fn default_coin() -> Coin {
    Coin {
        name: "US Quarter".to_string(),
        image_ref: "/coins/us-quarter.png".to_string(),
    }
}

/// Every coin, in catalog order.
pub fn all_coins() -> Vec<Coin> {
    COINS
        .iter()
        .map(|&(name, image_ref)| Coin {
            name: name.to_string(),
            image_ref: image_ref.to_string(),
        })
        .collect()
}

/// A randomly ordered copy of the catalog.
pub fn shuffled() -> Vec<Coin> {
    let mut coins = all_coins();
    let mut rng = rand::rng();
    coins.shuffle(&mut rng);
    coins
}

/// Draw a single random coin for a new round.
pub fn draw_coin() -> Coin {
    let mut rng = rand::rng();
    let (name, image_ref) = COINS[rng.random_range(0..COINS.len())];
    Coin {
        name: name.to_string(),
        image_ref: image_ref.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffled_is_a_permutation() {
        let mut base = all_coins();
        let mut mixed = shuffled();
        assert_eq!(base.len(), mixed.len());
        base.sort_by(|a, b| a.name.cmp(&b.name));
        mixed.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(base, mixed);
    }

    #[test]
    fn drawn_coin_comes_from_the_catalog() {
        let coins = all_coins();
        for _ in 0..20 {
            let coin = draw_coin();
            assert!(coins.contains(&coin));
        }
    }

    #[test]
    fn default_coin_is_in_the_catalog() {
        assert!(all_coins().contains(&default_coin()));
    }
}
