//! Loop-level tests driving `run_repair_loop` through whole runs.
//!
//! The generator and analyzer are scripted; files, round logs and the
//! transcript are real and land in a temp directory.

use std::fs;

use codeloop::core::conversation::{Conversation, Role};
use codeloop::core::language::SourceLanguage;
use codeloop::core::verdict::Verdict;
use codeloop::repair::{RepairConfig, RepairEvent, RepairStop, run_repair_loop};
use codeloop::test_support::{ScriptedAnalyzer, ScriptedGenerator, diagnostic};

/// Rounds 1-4 report a defect in `Foo`, round 5 comes back clean.
///
/// Checks call counts, history growth, the final transcript and the round logs.
#[test]
fn converges_on_last_allowed_attempt() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = RepairConfig::new(temp.path(), SourceLanguage::Java);
    let generator = ScriptedGenerator::repeating("class Foo { int x; }\n", 5);
    let analyzer = ScriptedAnalyzer::new(
        (0..4)
            .map(|_| diagnostic("Foo.java", "NULL_DEREFERENCE"))
            .collect(),
    );
    let mut retries = Vec::new();

    let outcome = run_repair_loop(
        &generator,
        &analyzer,
        &config,
        Conversation::with_system("You are a helpful assistant."),
        "write Foo".to_string(),
        |event| {
            if let RepairEvent::RoundFailed { attempt, .. } = event {
                retries.push(*attempt);
            }
        },
    )
    .expect("loop");

    assert_eq!(outcome.stop, RepairStop::Converged);
    assert_eq!(outcome.attempts, 5);
    assert_eq!(generator.calls(), 5);
    assert_eq!(retries, vec![1, 2, 3, 4]);
    // System message, then one request/reply pair per completed round.
    assert_eq!(generator.history_lens(), vec![1, 3, 5, 7, 9]);
    assert_eq!(outcome.conversation.len(), 11);
    assert_eq!(outcome.conversation.exchanges(), 5);
    assert_eq!(outcome.conversation.messages()[0].role, Role::System);

    assert!(temp.path().join("Foo.java").exists());
    let transcript = fs::read_to_string(&outcome.transcript_path).expect("transcript");
    assert!(transcript.starts_with("system: You are a helpful assistant.\n"));
    assert_eq!(transcript.matches("user: ").count(), 5);
    assert_eq!(transcript.matches("assistant: ").count(), 5);

    for attempt in 1..=5 {
        let round_dir = temp.path().join(".rounds").join(attempt.to_string());
        assert!(round_dir.join("meta.json").exists(), "round {attempt}");
        assert!(round_dir.join("reply.txt").exists(), "round {attempt}");
    }
}

#[test]
fn exhausts_budget_and_leaves_no_failing_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = RepairConfig::new(temp.path(), SourceLanguage::Java);
    let generator = ScriptedGenerator::repeating("class Foo { int x; }\n", 5);
    let analyzer = ScriptedAnalyzer::always(diagnostic("Foo.java", "RESOURCE_LEAK"));

    let outcome = run_repair_loop(
        &generator,
        &analyzer,
        &config,
        Conversation::with_system("sys"),
        "write Foo".to_string(),
        |_| {},
    )
    .expect("loop");

    assert!(!outcome.converged());
    assert_eq!(outcome.attempts, 5);
    assert_eq!(generator.calls(), 5);
    match &outcome.stop {
        RepairStop::Exhausted { last_failure } => {
            assert_eq!(last_failure.unit, "Foo");
            assert!(last_failure.diagnostic.contains("RESOURCE_LEAK"));
        }
        RepairStop::Converged => panic!("expected exhaustion"),
    }
    assert!(!temp.path().join("Foo.java").exists());
    assert!(outcome.transcript_path.exists());
}

#[test]
fn clean_reply_with_two_units_converges_in_one_round() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = RepairConfig::new(temp.path(), SourceLanguage::Java);
    let generator =
        ScriptedGenerator::new(vec!["class Foo { int x; }\nclass Bar { void m(){} }\n"]);
    let analyzer = ScriptedAnalyzer::always(Verdict::Clean);

    let outcome = run_repair_loop(
        &generator,
        &analyzer,
        &config,
        Conversation::with_system("sys"),
        "write Foo and Bar".to_string(),
        |_| {},
    )
    .expect("loop");

    assert!(outcome.converged());
    assert_eq!(outcome.attempts, 1);
    assert_eq!(
        outcome.rounds[0].files,
        vec![temp.path().join("Foo.java"), temp.path().join("Bar.java")]
    );
    assert_eq!(
        fs::read_to_string(temp.path().join("Foo.java")).expect("Foo"),
        "class Foo { int x; }\n"
    );
    assert_eq!(
        fs::read_to_string(temp.path().join("Bar.java")).expect("Bar"),
        "class Bar { void m(){} }\n"
    );
    assert_eq!(
        analyzer.seen_contents(),
        vec![
            Some("class Foo { int x; }\n".to_string()),
            Some("class Bar { void m(){} }\n".to_string()),
        ]
    );
}

#[test]
fn repaired_unit_replaces_discarded_file() {
    let temp = tempfile::tempdir().expect("tempdir");
    let config = RepairConfig::new(temp.path(), SourceLanguage::Java);
    let generator = ScriptedGenerator::new(vec![
        "import java.util.List;\nclass Foo { List<String> xs; }\n",
        "import java.util.ArrayList;\nimport java.util.List;\nclass Foo { List<String> xs = new ArrayList<>(); }\n",
    ]);
    let analyzer = ScriptedAnalyzer::new(vec![diagnostic("Foo.java", "field never initialized")]);

    let outcome = run_repair_loop(
        &generator,
        &analyzer,
        &config,
        Conversation::with_system("sys"),
        "write Foo".to_string(),
        |_| {},
    )
    .expect("loop");

    assert!(outcome.converged());
    assert_eq!(outcome.attempts, 2);
    let contents = fs::read_to_string(temp.path().join("Foo.java")).expect("Foo");
    assert!(contents.starts_with("import java.util.ArrayList;\nimport java.util.List;\n\n"));
    assert!(contents.contains("new ArrayList<>()"));
    let requests = generator.requests();
    assert!(requests[1].contains("field never initialized"));
}
