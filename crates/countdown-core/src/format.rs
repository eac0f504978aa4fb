//! Time formatting for the clock and for voice announcements.
//!
//! Spoken phrases are Russian: every non-zero component is spelled out as a
//! cardinal in the right grammatical gender, followed by the noun in the form
//! the numeral agrees with ("одна минута", "две минуты", "пять минут").

pub const SECONDS_IN_MINUTE: u64 = 60;
pub const SECONDS_IN_HOUR: u64 = 3600;

/// Noun forms ordered `[plural, singular, dual]`.
pub type WordForms = [&'static str; 3];

pub const HOUR_FORMS: WordForms = ["часов", "час", "часа"];
pub const MINUTE_FORMS: WordForms = ["минут", "минута", "минуты"];
pub const SECOND_FORMS: WordForms = ["секунд", "секунда", "секунды"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Masculine,
    Feminine,
}

const UNITS_MASCULINE: [&str; 10] = [
    "", "один", "два", "три", "четыре", "пять", "шесть", "семь", "восемь", "девять",
];
const UNITS_FEMININE: [&str; 10] = [
    "", "одна", "две", "три", "четыре", "пять", "шесть", "семь", "восемь", "девять",
];
const TEENS: [&str; 10] = [
    "десять",
    "одиннадцать",
    "двенадцать",
    "тринадцать",
    "четырнадцать",
    "пятнадцать",
    "шестнадцать",
    "семнадцать",
    "восемнадцать",
    "девятнадцать",
];
const TENS: [&str; 10] = [
    "",
    "",
    "двадцать",
    "тридцать",
    "сорок",
    "пятьдесят",
    "шестьдесят",
    "семьдесят",
    "восемьдесят",
    "девяносто",
];
const HUNDREDS: [&str; 10] = [
    "",
    "сто",
    "двести",
    "триста",
    "четыреста",
    "пятьсот",
    "шестьсот",
    "семьсот",
    "восемьсот",
    "девятьсот",
];

/// Scale words above the first triad, with the gender their count agrees in.
const SCALES: [(WordForms, Gender); 6] = [
    (["тысяч", "тысяча", "тысячи"], Gender::Feminine),
    (["миллионов", "миллион", "миллиона"], Gender::Masculine),
    (["миллиардов", "миллиард", "миллиарда"], Gender::Masculine),
    (["триллионов", "триллион", "триллиона"], Gender::Masculine),
    (["квадриллионов", "квадриллион", "квадриллиона"], Gender::Masculine),
    (["квинтиллионов", "квинтиллион", "квинтиллиона"], Gender::Masculine),
];

/// Split seconds into `(hours, minutes, seconds)`.
pub fn seconds_to_hms(seconds: u64) -> (u64, u64, u64) {
    let hours = seconds / SECONDS_IN_HOUR;
    let rest = seconds % SECONDS_IN_HOUR;
    (hours, rest / SECONDS_IN_MINUTE, rest % SECONDS_IN_MINUTE)
}

/// Pick the noun form a number agrees with.
pub fn word_form(number: u64, forms: &WordForms) -> &'static str {
    let last_digit = number % 10;
    let last_two = number % 100;
    let teen = (11..=14).contains(&last_two);

    match last_digit {
        1 if !teen => forms[1],
        2..=4 if !teen => forms[2],
        _ => forms[0],
    }
}

/// Spell a number out in words.
pub fn number_to_words(number: u64, gender: Gender) -> String {
    if number == 0 {
        return "ноль".to_string();
    }

    let mut triads = Vec::new();
    let mut rest = number;
    while rest > 0 {
        triads.push(rest % 1000);
        rest /= 1000;
    }

    let mut words: Vec<&'static str> = Vec::new();
    for (scale, &triad) in triads.iter().enumerate().rev() {
        if triad == 0 {
            continue;
        }
        if scale == 0 {
            push_triad(&mut words, triad, gender);
            continue;
        }
        let (forms, scale_gender) = SCALES[scale - 1];
        // "тысяча", not "одна тысяча"
        if !(scale == 1 && triad == 1) {
            push_triad(&mut words, triad, scale_gender);
        }
        words.push(word_form(triad, &forms));
    }

    words.join(" ")
}

fn push_triad(words: &mut Vec<&'static str>, triad: u64, gender: Gender) {
    let hundreds = (triad / 100) as usize;
    let tens = (triad % 100 / 10) as usize;
    let units = (triad % 10) as usize;

    if hundreds > 0 {
        words.push(HUNDREDS[hundreds]);
    }
    if tens == 1 {
        words.push(TEENS[units]);
        return;
    }
    if tens > 1 {
        words.push(TENS[tens]);
    }
    if units > 0 {
        let table = match gender {
            Gender::Masculine => &UNITS_MASCULINE,
            Gender::Feminine => &UNITS_FEMININE,
        };
        words.push(table[units]);
    }
}

/// `"<number in words> <noun>"`, or nothing for zero.
fn component(number: u64, gender: Gender, forms: &WordForms) -> Option<String> {
    (number != 0).then(|| format!("{} {}", number_to_words(number, gender), word_form(number, forms)))
}

/// Phrase announcing the remaining time, e.g. `"Одна минута пять секунд"`.
pub fn seconds_to_phrase(seconds: u64) -> String {
    let (hours, minutes, secs) = seconds_to_hms(seconds);

    let phrase = [
        component(hours, Gender::Masculine, &HOUR_FORMS),
        component(minutes, Gender::Feminine, &MINUTE_FORMS),
        component(secs, Gender::Feminine, &SECOND_FORMS),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(" ");

    capitalize(phrase.trim())
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
