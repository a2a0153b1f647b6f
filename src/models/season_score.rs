//! Season scoring
//!
//! Points a finished listening or reading part earns in the running season.
//! The learner's estimated TOEIC score picks a level; lower levels earn more
//! per correct answer so beginners can keep up on the leaderboard. Finishing
//! under the expected time and answering at least 80% correctly add bonuses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Questions per skill in a practice exam; correct counts are scaled from this
pub const QUESTIONS_PER_SKILL: i32 = 61;
/// Number of most recent exams the TOEIC estimate averages over
pub const ESTIMATE_WINDOW: usize = 10;
/// Accuracy from which the accuracy bonus applies
pub const ACCURACY_BONUS_THRESHOLD: f64 = 0.8;

/// Listening TOEIC score by correct answers out of 100
pub static LISTENING_SCORE_TABLE: [i32; 101] = [
    5, 15, 20, 25, 30, 35, 40, 45, 50, 55,
    60, 65, 70, 75, 80, 85, 90, 95, 100, 105,
    110, 115, 120, 125, 130, 135, 140, 145, 150, 155,
    160, 165, 170, 175, 180, 185, 190, 195, 200, 205,
    210, 215, 220, 225, 230, 235, 240, 245, 250, 255,
    260, 265, 270, 275, 280, 285, 290, 295, 300, 305,
    310, 315, 320, 325, 330, 335, 340, 345, 350, 355,
    360, 365, 370, 375, 380, 385, 395, 400, 405, 410,
    415, 420, 425, 430, 435, 440, 445, 450, 455, 460,
    465, 470, 475, 480, 485, 490, 495, 495, 495, 495,
    495,
];

/// Reading TOEIC score by correct answers out of 100
pub static READING_SCORE_TABLE: [i32; 101] = [
    5, 5, 5, 10, 15, 20, 25, 30, 35, 40,
    45, 50, 55, 60, 65, 70, 75, 80, 85, 90,
    95, 100, 105, 110, 115, 120, 125, 130, 135, 140,
    145, 150, 155, 160, 165, 170, 175, 180, 185, 190,
    195, 200, 205, 210, 215, 220, 225, 230, 235, 240,
    245, 250, 255, 260, 265, 270, 275, 280, 285, 290,
    295, 300, 305, 310, 315, 320, 325, 330, 335, 340,
    345, 350, 355, 360, 365, 370, 375, 380, 385, 390,
    395, 400, 405, 410, 415, 420, 425, 430, 435, 440,
    445, 450, 455, 460, 465, 470, 475, 480, 485, 490,
    495,
];

/// Skill of an exam part; only these two earn season points
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Skill {
    Listening,
    Reading,
}

impl Skill {
    /// Skill named by the prefix of a part code, e.g. `LISTENING_PART_1`
    pub fn from_part_code(code: &str) -> Option<Self> {
        let code = code.trim().to_ascii_uppercase();
        if code.starts_with("LISTENING") {
            Some(Self::Listening)
        } else if code.starts_with("READING") {
            Some(Self::Reading)
        } else {
            None
        }
    }

    fn score_table(self) -> &'static [i32; 101] {
        match self {
            Self::Listening => &LISTENING_SCORE_TABLE,
            Self::Reading => &READING_SCORE_TABLE,
        }
    }
}

/// Scoring parameters of one TOEIC band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelConfig {
    pub level: &'static str,
    pub min_score: i32,
    pub max_score: i32,
    pub base_points_per_correct: i32,
    pub time_bonus_percent: f64,
    pub accuracy_bonus_percent: f64,
}

pub static LEVELS: [LevelConfig; 6] = [
    LevelConfig {
        level: "Beginner",
        min_score: 10,
        max_score: 250,
        base_points_per_correct: 15,
        time_bonus_percent: 0.30,
        accuracy_bonus_percent: 1.50,
    },
    LevelConfig {
        level: "Elementary",
        min_score: 255,
        max_score: 400,
        base_points_per_correct: 12,
        time_bonus_percent: 0.28,
        accuracy_bonus_percent: 1.20,
    },
    LevelConfig {
        level: "Intermediate",
        min_score: 405,
        max_score: 600,
        base_points_per_correct: 8,
        time_bonus_percent: 0.25,
        accuracy_bonus_percent: 0.90,
    },
    LevelConfig {
        level: "Upper-Intermediate",
        min_score: 605,
        max_score: 780,
        base_points_per_correct: 5,
        time_bonus_percent: 0.20,
        accuracy_bonus_percent: 0.60,
    },
    LevelConfig {
        level: "Advanced",
        min_score: 785,
        max_score: 900,
        base_points_per_correct: 3,
        time_bonus_percent: 0.15,
        accuracy_bonus_percent: 0.40,
    },
    LevelConfig {
        level: "Proficient",
        min_score: 905,
        max_score: 990,
        base_points_per_correct: 2,
        time_bonus_percent: 0.10,
        accuracy_bonus_percent: 0.20,
    },
];

/// Band of an estimated TOEIC score; scores below every band count as beginner
pub fn level_for(toeic: i32) -> &'static LevelConfig {
    LEVELS
        .iter()
        .rev()
        .find(|level| toeic >= level.min_score)
        .unwrap_or(&LEVELS[0])
}

/// TOEIC score of `correct` answers out of `total`, scaled to 100 questions
/// and rounded half away from zero before the table lookup
pub fn scaled_toeic(skill: Skill, correct: f64, total: i32) -> i32 {
    let table = skill.score_table();
    if correct <= 0.0 || total <= 0 {
        return table[0];
    }
    let scaled = (correct / f64::from(total) * 100.0).round().clamp(0.0, 100.0);
    table[scaled as usize]
}

/// A completed listening or reading part, as used by the TOEIC estimate
#[derive(Debug, Clone, PartialEq)]
pub struct SkillAttempt {
    pub exam_id: i64,
    pub exam_part_id: i64,
    pub skill: Skill,
    pub correct: i32,
    pub finished_at: Option<DateTime<Utc>>,
}

/// Estimated TOEIC score (0..=990) from a learner's completed parts.
///
/// Only the first attempt of each part counts. Parts of the same exam and
/// skill are summed, the ten most recently started exams are averaged per
/// skill and each average goes through its skill's table.
pub fn estimate_toeic(attempts: &[SkillAttempt]) -> i32 {
    if attempts.is_empty() {
        return 0;
    }

    let mut first_per_part: HashMap<(i64, i64), &SkillAttempt> = HashMap::new();
    for attempt in attempts {
        first_per_part
            .entry((attempt.exam_id, attempt.exam_part_id))
            .and_modify(|kept| {
                if attempt.finished_at < kept.finished_at {
                    *kept = attempt;
                }
            })
            .or_insert(attempt);
    }

    let mut per_exam: HashMap<(i64, Skill), (f64, Option<DateTime<Utc>>)> = HashMap::new();
    for attempt in first_per_part.values() {
        let entry = per_exam
            .entry((attempt.exam_id, attempt.skill))
            .or_insert((0.0, attempt.finished_at));
        entry.0 += f64::from(attempt.correct);
        entry.1 = entry.1.min(attempt.finished_at);
    }

    let mut exams: Vec<((i64, Skill), (f64, Option<DateTime<Utc>>))> = per_exam.into_iter().collect();
    exams.sort_by(|a, b| b.1 .1.cmp(&a.1 .1).then(b.0 .0.cmp(&a.0 .0)));
    exams.truncate(ESTIMATE_WINDOW);

    let average = |skill: Skill| {
        let totals: Vec<f64> = exams
            .iter()
            .filter(|((_, s), _)| *s == skill)
            .map(|(_, (correct, _))| *correct)
            .collect();
        if totals.is_empty() {
            0.0
        } else {
            totals.iter().sum::<f64>() / totals.len() as f64
        }
    };

    scaled_toeic(Skill::Listening, average(Skill::Listening), QUESTIONS_PER_SKILL)
        + scaled_toeic(Skill::Reading, average(Skill::Reading), QUESTIONS_PER_SKILL)
}

/// Bonus for finishing before the expected time, truncated to whole points
pub fn time_bonus(time_spent_seconds: i32, expected_time_seconds: i32, percent: f64) -> i32 {
    if expected_time_seconds <= 0 || time_spent_seconds >= expected_time_seconds {
        return 0;
    }
    let saved = f64::from(expected_time_seconds - time_spent_seconds.max(0))
        / f64::from(expected_time_seconds);
    (saved * percent * 100.0) as i32
}

/// Bonus growing linearly from 80% accuracy (nothing) to 100% (full percent)
pub fn accuracy_bonus(accuracy: f64, base_points: i32, percent: f64) -> i32 {
    if accuracy < ACCURACY_BONUS_THRESHOLD {
        return 0;
    }
    let ratio = (accuracy - ACCURACY_BONUS_THRESHOLD) / (1.0 - ACCURACY_BONUS_THRESHOLD);
    (f64::from(base_points) * percent * ratio) as i32
}

/// Points earned by one finished part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub base_points: i32,
    pub time_bonus: i32,
    pub accuracy_bonus: i32,
}

impl ScoreBreakdown {
    pub fn total(&self) -> i32 {
        self.base_points + self.time_bonus + self.accuracy_bonus
    }
}

/// Score a finished part at the given level. No correct answer earns nothing.
pub fn score_part(input: &CalculateScoreInput, level: &LevelConfig) -> ScoreBreakdown {
    if input.correct_answers <= 0 {
        return ScoreBreakdown::default();
    }
    let base_points = input.correct_answers * level.base_points_per_correct;
    let accuracy = if input.total_questions > 0 {
        f64::from(input.correct_answers) / f64::from(input.total_questions)
    } else {
        0.0
    };
    ScoreBreakdown {
        base_points,
        time_bonus: time_bonus(
            input.time_spent_seconds,
            input.expected_time_seconds,
            level.time_bonus_percent,
        ),
        accuracy_bonus: accuracy_bonus(accuracy, base_points, level.accuracy_bonus_percent),
    }
}

/// Message shown after a part; repeats get a generic one
pub fn completion_message(points: i32, first_attempt: bool) -> &'static str {
    if !first_attempt {
        return "Great job completing this part! Keep practicing to improve your skills.";
    }
    match points {
        p if p >= 400 => "Excellent work! You've earned a fantastic score on this part!",
        p if p >= 300 => "Well done! Great effort on completing this part!",
        p if p >= 200 => "Good job! You're making steady progress!",
        p if p >= 100 => "Nice try! Keep practicing and you'll improve!",
        _ => "Part completed! Every practice session helps you grow!",
    }
}

/// Result of a finished part submitted for season points
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CalculateScoreInput {
    pub exam_attempt_id: i64,
    pub correct_answers: i32,
    pub total_questions: i32,
    #[serde(default)]
    pub time_spent_seconds: i32,
    #[serde(default)]
    pub expected_time_seconds: i32,
}

/// Points of one part and the caller's season total afterwards
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeasonScoreResult {
    pub leaderboard_id: i64,
    /// Points the part is worth, whether or not they were added
    pub season_score: i32,
    #[serde(flatten)]
    pub breakdown: ScoreBreakdown,
    /// Points actually added; zero for repeats and parts without a correct answer
    pub points_added: i32,
    pub is_first_attempt: bool,
    pub message: String,
    pub total_accumulated_score: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn attempt(exam_id: i64, part: i64, skill: Skill, correct: i32, days_ago: i64) -> SkillAttempt {
        SkillAttempt {
            exam_id,
            exam_part_id: part,
            skill,
            correct,
            finished_at: Some(Utc::now() - Duration::days(days_ago)),
        }
    }

    fn submitted(correct: i32, total: i32, spent: i32, expected: i32) -> CalculateScoreInput {
        CalculateScoreInput {
            exam_attempt_id: 1,
            correct_answers: correct,
            total_questions: total,
            time_spent_seconds: spent,
            expected_time_seconds: expected,
        }
    }

    #[test]
    fn test_part_codes_name_the_skill() {
        assert_eq!(Skill::from_part_code("LISTENING_PART_1"), Some(Skill::Listening));
        assert_eq!(Skill::from_part_code("reading-5"), Some(Skill::Reading));
        assert_eq!(Skill::from_part_code("WRITING_1"), None);
        assert_eq!(Skill::from_part_code("P1"), None);
    }

    #[test]
    fn test_scaled_lookup() {
        assert_eq!(scaled_toeic(Skill::Listening, 0.0, 61), 5);
        assert_eq!(scaled_toeic(Skill::Reading, 10.0, 0), 5);
        // 61 of 61 is 100 questions
        assert_eq!(scaled_toeic(Skill::Listening, 61.0, 61), 495);
        // 30 / 61 = 49.18 -> 49
        assert_eq!(scaled_toeic(Skill::Listening, 30.0, 61), 255);
        assert_eq!(scaled_toeic(Skill::Reading, 30.0, 61), 240);
        // 1 of 2 is exactly 50
        assert_eq!(scaled_toeic(Skill::Reading, 1.0, 2), 245);
    }

    #[test]
    fn test_levels() {
        assert_eq!(level_for(0).level, "Beginner");
        assert_eq!(level_for(250).level, "Beginner");
        assert_eq!(level_for(255).level, "Elementary");
        assert_eq!(level_for(604).level, "Intermediate");
        assert_eq!(level_for(990).level, "Proficient");
    }

    #[test]
    fn test_estimate_counts_first_attempts_per_exam() {
        assert_eq!(estimate_toeic(&[]), 0);

        let attempts = vec![
            // exam 1: two listening parts summed to 30 correct
            attempt(1, 10, Skill::Listening, 20, 9),
            attempt(1, 11, Skill::Listening, 10, 8),
            // retake of part 10 is ignored
            attempt(1, 10, Skill::Listening, 61, 1),
            // exam 2 listening 61 correct; average (30 + 61) / 2 = 45.5
            attempt(2, 20, Skill::Listening, 61, 5),
            attempt(2, 21, Skill::Reading, 30, 5),
        ];
        // listening 45.5 / 61 = 74.59 -> 75 -> 385; reading 30 / 61 -> 49 -> 240
        assert_eq!(estimate_toeic(&attempts), 385 + 240);
    }

    #[test]
    fn test_estimate_uses_the_ten_latest_exams() {
        let mut attempts: Vec<SkillAttempt> = (1..=10)
            .map(|exam| attempt(exam, exam * 10, Skill::Reading, 61, exam))
            .collect();
        // oldest exam with no correct answers falls outside the window
        attempts.push(attempt(99, 990, Skill::Reading, 0, 100));
        assert_eq!(estimate_toeic(&attempts), 5 + 495);
    }

    #[test]
    fn test_bonuses() {
        assert_eq!(time_bonus(600, 600, 0.3), 0);
        assert_eq!(time_bonus(300, 600, 0.3), 15);
        assert_eq!(time_bonus(10, 0, 0.3), 0);

        assert_eq!(accuracy_bonus(0.79, 100, 1.5), 0);
        assert_eq!(accuracy_bonus(0.8, 100, 1.5), 0);
        assert_eq!(accuracy_bonus(0.9, 100, 1.5), 75);
        assert_eq!(accuracy_bonus(1.0, 100, 1.5), 150);
    }

    #[test]
    fn test_score_part() {
        let beginner = level_for(0);
        let breakdown = score_part(&submitted(10, 10, 300, 600), beginner);
        assert_eq!(
            breakdown,
            ScoreBreakdown { base_points: 150, time_bonus: 15, accuracy_bonus: 225 }
        );
        assert_eq!(breakdown.total(), 390);

        let proficient = level_for(950);
        assert_eq!(score_part(&submitted(5, 10, 700, 600), proficient).total(), 10);
        assert_eq!(score_part(&submitted(0, 10, 10, 600), beginner), ScoreBreakdown::default());
    }

    #[test]
    fn test_completion_messages() {
        assert!(completion_message(900, false).starts_with("Great job"));
        assert!(completion_message(400, true).starts_with("Excellent"));
        assert!(completion_message(150, true).starts_with("Nice try"));
        assert!(completion_message(0, true).starts_with("Part completed"));
    }

    proptest! {
        #[test]
        fn prop_scaled_toeic_within_table(correct in 0.0f64..200.0, total in 0i32..100) {
            for skill in [Skill::Listening, Skill::Reading] {
                let score = scaled_toeic(skill, correct, total);
                prop_assert!((5..=495).contains(&score));
            }
        }
    }
}
