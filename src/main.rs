use std::{process, sync::Arc};

use brusio::{
    application::{
        accounts::{AccountService, SessionStore},
        error::AppError,
        feed::FeedService,
        follows::FollowService,
        posts::PostService,
        repos::{
            CommentsRepo, FollowsRepo, GroupsRepo, NewGroupParams, PostsRepo, RepoError, UsersRepo,
        },
    },
    config,
    domain::slug::generate_unique_slug,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, RouterState},
        page_cache::PageCache,
        telemetry,
    },
};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::CreateGroup(args) => run_create_group(settings, args).await,
    }
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;

    let posts_repo: Arc<dyn PostsRepo> = repositories.clone();
    let groups_repo: Arc<dyn GroupsRepo> = repositories.clone();
    let users_repo: Arc<dyn UsersRepo> = repositories.clone();
    let comments_repo: Arc<dyn CommentsRepo> = repositories.clone();
    let follows_repo: Arc<dyn FollowsRepo> = repositories.clone();

    let sessions = Arc::new(SessionStore::new(settings.sessions.ttl));

    let state = RouterState {
        feed: Arc::new(FeedService::new(
            posts_repo.clone(),
            groups_repo.clone(),
            users_repo.clone(),
        )),
        posts: Arc::new(PostService::new(posts_repo, groups_repo, comments_repo)),
        follows: Arc::new(FollowService::new(follows_repo, users_repo.clone())),
        accounts: Arc::new(AccountService::new(users_repo, sessions)),
        db: Some(repositories.clone()),
        cache: settings
            .cache
            .enabled
            .then(|| Arc::new(PageCache::new(settings.cache.page_ttl))),
    };

    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(target = "brusio::serve", addr = %settings.server.addr, "listening");

    axum::serve(listener, router.into_make_service())
        .await
        .map_err(|err| AppError::unexpected(format!("server error: {err}")))?;

    Ok(())
}

async fn run_create_group(
    settings: config::Settings,
    args: config::CreateGroupArgs,
) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let groups_repo: Arc<dyn GroupsRepo> = repositories.clone();

    let existing: Vec<String> = groups_repo
        .list_all()
        .await
        .map_err(|err| AppError::unexpected(err.to_string()))?
        .into_iter()
        .map(|group| group.slug)
        .collect();

    let slug = match args.slug {
        Some(slug) => slug,
        None => generate_unique_slug(&args.title, |candidate| {
            !existing.iter().any(|slug| slug == candidate)
        })
        .map_err(|err| AppError::validation(err.to_string()))?,
    };

    let group = groups_repo
        .create_group(NewGroupParams {
            title: args.title,
            slug,
            description: args.description.unwrap_or_default(),
        })
        .await
        .map_err(|err| match err {
            RepoError::Duplicate { .. } => {
                AppError::validation("a group with this slug already exists")
            }
            other => AppError::unexpected(other.to_string()),
        })?;

    info!(
        target = "brusio::create_group",
        slug = %group.slug,
        title = %group.title,
        "group created"
    );
    Ok(())
}
