// Prevents additional console window on Windows in release, DO NOT REMOVE!!
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use std::sync::Arc;
use std::time::Duration;

use tauri::{Manager, State};
use tracing::{error, info, warn};

use tube_vault::commands::*;
use tube_vault::utils::init_tracing_with;
use tube_vault::{
    AppConfig, AppState, Collaborators, GoogleOAuthClient, HttpYoutubeBackend, LocalVectorStore,
    SystemBrowser,
};

/// 构建外部协作对象；向量库打不开时退回内存存储，保证应用仍可启动
fn build_collaborators(config: &AppConfig) -> anyhow::Result<Collaborators> {
    let oauth = GoogleOAuthClient::new(Arc::new(SystemBrowser))
        .map_err(|e| anyhow::anyhow!("OAuth client creation failed: {}", e))?;
    let youtube = HttpYoutubeBackend::new(&config.lookup)
        .map_err(|e| anyhow::anyhow!("YouTube backend creation failed: {}", e))?;

    let store = match config.vector_store_dir() {
        Ok(dir) => {
            info!("🗄️ Opening vector store at {}", dir.display());
            match tauri::async_runtime::block_on(LocalVectorStore::open(&dir)) {
                Ok(store) => store,
                Err(e) => {
                    error!("❌ Failed to open vector store: {}, using in-memory store", e);
                    LocalVectorStore::in_memory()
                }
            }
        }
        Err(e) => {
            warn!("No data directory available ({}), using in-memory store", e);
            LocalVectorStore::in_memory()
        }
    };

    Ok(Collaborators {
        oauth: Arc::new(oauth),
        store: Arc::new(store),
        youtube: Arc::new(youtube),
    })
}

fn main() -> anyhow::Result<()> {
    let config = AppState::load_or_initialize_config();

    // 初始化日志系统
    init_tracing_with(Some(&config.advanced.log_level));

    info!("🚀 Starting Tube Vault v{}", tube_vault::VERSION);

    let debounce = Duration::from_millis(config.lookup.debounce_ms);
    let collaborators = build_collaborators(&config)?;
    let app_state = AppState::new(config, collaborators)?;

    tauri::Builder::default()
        .manage(app_state)
        .invoke_handler(tauri::generate_handler![
            // 登录相关命令
            get_session,
            sign_in,
            sign_out,
            refresh_session,
            // 设置相关命令
            get_settings,
            save_settings,
            get_model_choices,
            // YouTube 相关命令
            submit_video_url,
            get_youtube_videodata,
            get_youtube_captions,
            validate_youtube_url,
            // 视频库命令
            save_video,
            get_videos,
            // 模型相关命令
            generate_context_chunks,
            generate_embedding,
            generate_chatbot_answer,
            // 配置相关命令
            get_config,
            update_config,
            reset_config,
            export_config,
            import_config,
        ])
        .setup(move |app| {
            info!("🔧 Setting up application");

            let app_handle = app.handle();

            // 防抖任务必须在异步运行时内创建
            let debouncer = tauri::async_runtime::block_on(async {
                LookupDebouncer::spawn(app_handle.clone(), debounce)
            });
            app.manage(debouncer);

            let app_state: State<AppState> = app.state();
            let state = app_state.inner().clone();

            // 异步初始化存储并恢复会话，不阻塞主线程
            tauri::async_runtime::spawn(async move {
                let _sync = state.start().await;
                info!("✅ Persistence ready");
                // 恢复的会话随就绪信号一起发给前端
                if let Err(e) = app_handle.emit_all(SESSION_CHANGED_EVENT, state.session.snapshot()) {
                    error!("Failed to emit {} event: {}", SESSION_CHANGED_EVENT, e);
                }
                if let Err(e) = app_handle.emit_all("app_ready", true) {
                    error!("Failed to emit app_ready event: {}", e);
                }
            });

            Ok(())
        })
        .on_window_event(|event| {
            if let tauri::WindowEvent::CloseRequested { .. } = event.event() {
                info!("🔚 Application closing");
            }
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");

    Ok(())
}
