//! 在真实 tokio 本地任务集上运行引擎

use std::rc::Rc;
use std::time::Duration;

use autotranslate::dom::LiveDocument;
use autotranslate::translation::{
    FixedLanguage, TokioFrameScheduler, TranslatorConfig, TranslatorEngine,
};

#[allow(dead_code)]
mod common {
    include!("common/mod.rs");
}

use common::{HtmlTestHelper, MockBackend};

async fn wait_for<F: Fn() -> bool>(condition: F, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}

fn texts(document: &LiveDocument) -> Vec<String> {
    HtmlTestHelper::text_nodes(document.body())
        .iter()
        .filter_map(autotranslate::dom::text_value)
        .collect()
}

#[tokio::test(flavor = "current_thread")]
async fn test_engine_translates_with_frame_timer() {
    let local = tokio::task::LocalSet::new();

    local
        .run_until(async {
            let mut config = TranslatorConfig::default();
            config.frame_interval_ms = 1;

            let document = Rc::new(LiveDocument::parse("<p>Hello</p>").unwrap());
            let backend = Rc::new(MockBackend::new());
            let engine = TranslatorEngine::new(
                config.clone(),
                document.clone(),
                backend.clone(),
                Rc::new(TokioFrameScheduler::new(config.frame_interval())),
                Rc::new(FixedLanguage::new("es")),
            )
            .unwrap();

            engine.start();
            assert!(wait_for(|| engine.is_idle(), Duration::from_secs(2)).await);
            assert_eq!(texts(&document), vec!["Hola".to_string()]);

            document
                .append_html(document.body(), "<p>World</p>")
                .unwrap();
            let translated = wait_for(
                || texts(&document) == vec!["Hola".to_string(), "Mundo".to_string()],
                Duration::from_secs(2),
            )
            .await;
            assert!(translated);

            assert_eq!(backend.request_count(), 2);
            assert_eq!(engine.stats().mutation_deliveries, 1);
            engine.shutdown();
        })
        .await;
}
