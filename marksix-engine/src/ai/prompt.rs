use std::fmt::Write;

use marksix_db::models::{Draw, Region};

use crate::attributes::zodiac;

fn format_numbers(numbers: &[u8]) -> String {
    numbers
        .iter()
        .map(|n| format!("{n:02}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Consigne envoyée au service de génération, à partir des tirages les plus récents en premier.
pub fn build_prompt(region: Region, draws: &[Draw]) -> String {
    let mut prompt = String::new();
    let _ = writeln!(
        prompt,
        "Tu es un analyste de loterie Mark Six (région {region}). \
         Voici les {} derniers tirages, du plus récent au plus ancien :",
        draws.len()
    );

    for draw in draws {
        let _ = write!(
            prompt,
            "- Tirage {} ({}) : {} | spécial {:02}",
            draw.sequence_id,
            draw.date,
            format_numbers(&draw.normal_numbers),
            draw.special_number,
        );
        if let Some(z) = zodiac(draw.special_number).filter(|_| region == Region::Primary) {
            let _ = write!(prompt, " ({z})");
        }
        prompt.push('\n');
    }

    prompt.push_str(
        "\nPropose 6 numéros normaux distincts entre 1 et 49 et 1 numéro spécial différent des six.\n\
         Réponds sous la forme :\n\
         平码：n1, n2, n3, n4, n5, n6\n\
         特码：s\n",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::make_test_draws;

    #[test]
    fn test_prompt_lists_draws_in_order() {
        let draws = make_test_draws(&[1, 14]);
        let prompt = build_prompt(Region::Secondary, &draws);
        let first = prompt.find(&format!("Tirage {}", draws[0].sequence_id)).unwrap();
        let second = prompt.find(&format!("Tirage {}", draws[1].sequence_id)).unwrap();
        assert!(first < second);
        assert!(prompt.contains("spécial 01"));
        assert!(prompt.contains("spécial 14"));
        assert!(prompt.contains("特码"));
    }

    #[test]
    fn test_zodiac_only_for_primary() {
        let draws = make_test_draws(&[1]);
        let primary = build_prompt(Region::Primary, &draws);
        let secondary = build_prompt(Region::Secondary, &draws);
        let glyph = zodiac(1).unwrap().to_string();
        assert!(primary.contains(&format!("({glyph})")));
        assert!(!secondary.contains(&format!("({glyph})")));
    }
}
