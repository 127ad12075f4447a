use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use serde_json::{Map, json};
use tokio::time::{Duration, sleep};

use pictor_core::app::{EngineBuilder, EngineConfig, TaskService};
use pictor_core::domain::{QuotaType, TaskId, TaskStatus, TaskType, UserId};
use pictor_core::ports::{
    IdGenerator, ImageProcessor, ProcessError, ProcessOutput, ProcessRequest, SystemClock,
    UlidGenerator,
};

/// デモ用の外部処理系。実際のプロバイダ呼び出しの代わりに少し眠って
/// 決め打ちの出力を返す。最初の n 回はわざと失敗する。
struct DemoProcessor {
    remaining_failures: AtomicU32,
}

impl DemoProcessor {
    fn new(induced_failures: u32) -> Self {
        Self {
            remaining_failures: AtomicU32::new(induced_failures),
        }
    }
}

#[async_trait]
impl ImageProcessor for DemoProcessor {
    async fn process(&self, request: ProcessRequest) -> Result<ProcessOutput, ProcessError> {
        // 外部プロバイダの処理時間のつもり
        sleep(Duration::from_millis(150)).await;

        let left = self.remaining_failures.load(Ordering::Relaxed);
        if left > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::Relaxed);
            return Err(ProcessError::new(format!(
                "provider unavailable (intentional failure, left={left})"
            )));
        }

        let mut output = ProcessOutput::new(format!("img://output/{}.png", request.task_type));
        if request.task_type == TaskType::Translate {
            let target = request.parameters["target_lang"].as_str().unwrap_or("en");
            output = output
                .with_result("original_text", json!("新品上市"))
                .with_result("translated_text", json!(format!("[{target}] New arrival")));
        }
        Ok(output)
    }
}

/// 完了をポーリングで待つ（Completed / Failed のどちらか）
async fn poll_until_terminal(service: &TaskService, task_id: TaskId) -> TaskStatus {
    loop {
        let view = service
            .get_task_status(task_id)
            .await
            .expect("task exists");
        if view.status.is_terminal() {
            match view.status {
                TaskStatus::Completed => {
                    println!(
                        "  -> completed: output={}",
                        view.output_ref.as_deref().unwrap_or("-")
                    );
                }
                _ => {
                    println!(
                        "  -> failed: {}",
                        view.error_message.as_deref().unwrap_or("-")
                    );
                }
            }
            return view.status;
        }
        sleep(Duration::from_millis(50)).await;
    }
}

fn demo_parameters(task_type: TaskType) -> Option<Map<String, serde_json::Value>> {
    let value = match task_type {
        TaskType::Retouch => json!({"brightness": 1.1, "contrast": 1.05}),
        TaskType::Background => json!({"prompt": "marble tabletop, soft morning light"}),
        TaskType::Designer => json!({"prompt": "minimalist poster of a red chair", "style": "bauhaus"}),
        TaskType::Upscale => json!({"scale": 4}),
        TaskType::Translate => json!({"target_lang": "en"}),
        TaskType::Matting => return None,
    };
    match value {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pictor_core=info".into()),
        )
        .init();

    // (A) エンジンを組み立てる（in-memory store/ledger + デモ processor）
    let engine = EngineBuilder::new()
        .processor(Arc::new(DemoProcessor::new(1)))
        .config(EngineConfig {
            workers: 2,
            process_timeout: Duration::from_secs(10),
        })
        .build()
        .expect("engine wiring is complete");
    let service = engine.service();

    let ids = UlidGenerator::new(SystemClock);
    let user: UserId = ids.generate_user_id();
    println!("demo user: {user}");

    // (B) 配額をシードする（カテゴリはタスクタイプと 1:1）
    let seed = [
        (TaskType::Matting, 100),
        (TaskType::Retouch, 50),
        (TaskType::Background, 50),
        (TaskType::Designer, 30),
        (TaskType::Upscale, 100),
        (TaskType::Translate, 50),
    ];
    for (ty, total) in seed {
        service.grant_quota(user, QuotaType::from(ty), total, None).await;
    }

    // (C) 各タイプのタスクを一つずつ: 配額を消費してから作成、完了をポーリング
    for ty in TaskType::ALL {
        let quota = QuotaType::from(ty);
        let remaining = service
            .consume_quota(user, &quota, 1)
            .await
            .expect("seeded quota");
        let input_ref = ty
            .requires_input_ref()
            .then(|| format!("img://input/{ty}.png"));

        let task_id = service
            .create_task(user, ty, input_ref, demo_parameters(ty))
            .await
            .expect("valid create request");
        println!("{ty}: task={task_id} (quota remaining: {remaining})");
        poll_until_terminal(&service, task_id).await;
    }

    // (D) dispatch 時検証のデモ: designer に prompt を渡さない
    println!("designer without prompt:");
    let task_id = service
        .create_task(user, TaskType::Designer, None, Some(Map::new()))
        .await
        .expect("creation succeeds; validation happens at dispatch");
    poll_until_terminal(&service, task_id).await;

    // (E) キャンセルのデモ
    println!("cancellation:");
    let task_id = service
        .create_task(
            user,
            TaskType::Matting,
            Some("img://input/cancel-me.png".to_string()),
            None,
        )
        .await
        .expect("valid create request");
    match service.cancel_task(task_id, user).await {
        Ok(()) => println!("  -> cancelled"),
        Err(err) => println!("  -> {err}"),
    }
    let view = service.get_task_status(task_id).await.expect("task exists");
    println!(
        "  final: status={} message={}",
        view.status,
        view.error_message.as_deref().unwrap_or("-")
    );

    // (F) 配額切れのデモ
    println!("quota exhaustion:");
    let tiny = QuotaType::new("matting-trial");
    service.grant_quota(user, tiny.clone(), 1, None).await;
    service.consume_quota(user, &tiny, 1).await.expect("first consume fits");
    match service.consume_quota(user, &tiny, 1).await {
        Ok(_) => println!("  -> unexpectedly succeeded"),
        Err(err) => println!("  -> {err}"),
    }

    for view in service.get_remaining_quota(user, None).await {
        println!(
            "quota {}: {}/{} used (remaining {})",
            view.quota_type, view.used_quota, view.total_quota, view.remaining_quota
        );
    }

    engine.shutdown().await;
}
