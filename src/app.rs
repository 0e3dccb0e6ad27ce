use std::sync::Arc;

use anyhow::{Context, Result};
use dialer_api::{create_app, AppState};
use dialer_core::traits::{AgentRepository, AssignmentStore, CallRepository, LeadRepository};
use dialer_core::AppConfig;
use dialer_dispatcher::{AssignmentEngine, CallController, LeadDistributor, RequeuePolicy};
use dialer_infrastructure::{
    create_embedded_pool, SqliteAgentRepository, SqliteAssignmentStore, SqliteCallRepository,
    SqliteLeadRepository,
};
use tokio::{net::TcpListener, sync::broadcast};
use tracing::{error, info};

/// 应用运行模式
#[derive(Debug, Clone)]
pub enum AppMode {
    /// 仅运行批量分配循环
    Distributor,
    /// 仅运行API服务器
    Api,
    /// 运行所有组件
    All,
}

/// 主应用程序
pub struct Application {
    config: AppConfig,
    mode: AppMode,
    distributor: Arc<LeadDistributor>,
    call_controller: Arc<CallController>,
    lead_repo: Arc<dyn LeadRepository>,
    agent_repo: Arc<dyn AgentRepository>,
}

impl Application {
    /// 创建新的应用实例
    pub async fn new(config: AppConfig, mode: AppMode) -> Result<Self> {
        info!("初始化应用程序，模式: {:?}", mode);

        // 创建嵌入式数据库连接池（含迁移）
        info!("连接数据库: {}", config.database.url);
        let pool = create_embedded_pool(&config.database.url, config.database.max_connections)
            .await
            .context("初始化数据库失败")?;
        info!("数据库连接成功");

        // 创建Repository实例
        let lead_repo: Arc<dyn LeadRepository> = Arc::new(SqliteLeadRepository::new(pool.clone()));
        let agent_repo: Arc<dyn AgentRepository> =
            Arc::new(SqliteAgentRepository::new(pool.clone()));
        let call_repo: Arc<dyn CallRepository> = Arc::new(SqliteCallRepository::new(pool.clone()));
        let store: Arc<dyn AssignmentStore> = Arc::new(SqliteAssignmentStore::new(pool.clone()));

        // 创建分配引擎与各服务
        let engine = Arc::new(AssignmentEngine::new(
            Arc::clone(&lead_repo),
            Arc::clone(&agent_repo),
            Arc::clone(&store),
        ));
        let distributor = Arc::new(LeadDistributor::new(
            engine,
            Arc::clone(&lead_repo),
            Arc::clone(&agent_repo),
        ));
        let call_controller = Arc::new(CallController::new(
            Arc::clone(&lead_repo),
            Arc::clone(&agent_repo),
            call_repo,
            store,
            RequeuePolicy::from(&config.call_policy),
        ));

        Ok(Self {
            config,
            mode,
            distributor,
            call_controller,
            lead_repo,
            agent_repo,
        })
    }

    /// 运行应用程序
    pub async fn run(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动应用程序，模式: {:?}", self.mode);

        match self.mode {
            AppMode::Distributor => {
                self.run_distributor(shutdown_rx).await?;
            }
            AppMode::Api => {
                self.run_api(shutdown_rx).await?;
            }
            AppMode::All => {
                self.run_all_components(shutdown_rx).await?;
            }
        }

        Ok(())
    }

    /// 运行批量分配循环
    async fn run_distributor(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!(
            "启动批量分配循环，间隔 {} 秒",
            self.config.distributor.distribute_interval_seconds
        );

        run_distributor_loop(
            Arc::clone(&self.distributor),
            self.config.distributor.distribute_interval_seconds,
            shutdown_rx,
        )
        .await;

        info!("批量分配循环已停止");
        Ok(())
    }

    /// 运行API模式
    async fn run_api(&self, mut shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动API服务器: {}", self.config.api.bind_address);

        let state = AppState {
            distributor: Arc::clone(&self.distributor),
            call_controller: Arc::clone(&self.call_controller),
            lead_repo: Arc::clone(&self.lead_repo),
            agent_repo: Arc::clone(&self.agent_repo),
        };
        let app = create_app(state, &self.config.api);

        // 创建TCP监听器
        let listener = TcpListener::bind(&self.config.api.bind_address)
            .await
            .with_context(|| format!("绑定地址失败: {}", self.config.api.bind_address))?;

        info!("API服务器启动在 http://{}", self.config.api.bind_address);

        // 启动服务器
        let server_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app.into_make_service()).await {
                error!("API服务器运行失败: {}", e);
            }
        });

        // 等待关闭信号
        let _ = shutdown_rx.recv().await;
        info!("API服务器收到关闭信号");

        // 停止服务器
        server_handle.abort();

        info!("API服务器已停止");
        Ok(())
    }

    /// 运行所有组件
    async fn run_all_components(&self, shutdown_rx: broadcast::Receiver<()>) -> Result<()> {
        info!("启动所有组件");

        let mut handles = Vec::new();

        // 启动批量分配循环（如果启用）
        if self.config.distributor.enabled {
            let app = self.clone_for_mode(AppMode::Distributor);
            let shutdown_rx = shutdown_rx.resubscribe();

            handles.push(tokio::spawn(async move {
                if let Err(e) = app.run_distributor(shutdown_rx).await {
                    error!("批量分配循环运行失败: {}", e);
                }
            }));
        }

        // 启动API服务器（如果启用）
        if self.config.api.enabled {
            let app = self.clone_for_mode(AppMode::Api);
            let shutdown_rx = shutdown_rx.resubscribe();

            handles.push(tokio::spawn(async move {
                if let Err(e) = app.run_api(shutdown_rx).await {
                    error!("API服务器运行失败: {}", e);
                }
            }));
        }

        // 等待所有组件完成
        for handle in handles {
            let _ = handle.await;
        }

        info!("所有组件已停止");
        Ok(())
    }

    /// 为特定模式克隆应用实例
    fn clone_for_mode(&self, mode: AppMode) -> Self {
        Self {
            config: self.config.clone(),
            mode,
            distributor: Arc::clone(&self.distributor),
            call_controller: Arc::clone(&self.call_controller),
            lead_repo: Arc::clone(&self.lead_repo),
            agent_repo: Arc::clone(&self.agent_repo),
        }
    }
}

/// 运行批量分配循环
async fn run_distributor_loop(
    distributor: Arc<LeadDistributor>,
    interval_seconds: u64,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_seconds));

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if let Err(e) = distributor.distribute_leads().await {
                    error!("批量分配失败: {}", e);
                }
            }
            _ = shutdown_rx.recv() => {
                info!("批量分配循环收到关闭信号");
                break;
            }
        }
    }
}
