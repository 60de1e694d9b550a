use color_eyre::{eyre::eyre, Result};
use std::sync::Arc;
use tracing::info;

use haven::api::{AuthApi, RestClient};
use haven::auth::{AuthSession, SessionProvider, TokenStore};
use haven::config::Config;
use haven::history::HistoryStore;
use haven::models::{ProfileUpdate, Property, PropertyId};
use haven::storage::{KeyValueStore, SqliteStore};
use haven::store::{Notifier, PropertyStore, Severity};

use crate::commands::{Command, HistoryCommand, ListArgs};

/// Prints toasts to stderr so stdout only carries command output.
struct StderrNotifier;

impl Notifier for StderrNotifier {
  fn show_toast(&self, message: &str, severity: Severity) {
    match severity {
      Severity::Error => eprintln!("error: {}", message),
      Severity::Success => eprintln!("{}", message),
    }
  }
}

pub struct App {
  client: Arc<RestClient>,
  session: Arc<AuthSession>,
  store: PropertyStore,
  history: HistoryStore,
}

impl App {
  pub fn new(config: &Config) -> Result<Self> {
    let storage: Arc<dyn KeyValueStore> = Arc::new(match &config.storage.path {
      Some(path) => SqliteStore::open_at(path)?,
      None => SqliteStore::open()?,
    });

    let tokens = Arc::new(TokenStore::new(storage.clone()));
    tokens.hydrate();

    let client = Arc::new(RestClient::new(&config.api, tokens.clone())?);
    let session = Arc::new(AuthSession::new(tokens, storage.clone()));
    let store = PropertyStore::with_options(
      client.clone(),
      session.clone(),
      Arc::new(StderrNotifier),
      config.cache.store_options(),
    );

    info!(base_url = %client.base_url(), "Client ready");

    Ok(Self {
      client,
      session,
      store,
      history: HistoryStore::new(storage),
    })
  }

  pub async fn run(&self, command: Command) -> Result<()> {
    match command {
      Command::Login { email } => self.login(&email).await,
      Command::Logout => {
        self.client.logout().await?;
        self.store.clear_cache();
        println!("Signed out");
        Ok(())
      }
      Command::Guest => {
        self.session.continue_as_guest();
        println!("Browsing as guest");
        Ok(())
      }
      Command::Profile { name, email } => {
        let user = self
          .store
          .update_user(&*self.client, &ProfileUpdate { name, email })
          .await?;
        println!("{} <{}>", user.name, user.email);
        Ok(())
      }
      Command::List(args) => self.list(&args).await,
      Command::Show { id } => self.show(&PropertyId::new(id)).await,
      Command::Favorites => self.favorites().await,
      Command::Favorite { id } => {
        self.store.add_to_favorites(&PropertyId::new(id)).await?;
        Ok(())
      }
      Command::Unfavorite { id } => {
        self.store.remove_from_favorites(&PropertyId::new(id)).await?;
        Ok(())
      }
      Command::Status { id, status } => {
        self
          .store
          .update_property_status(&PropertyId::new(id), &status)
          .await?;
        Ok(())
      }
      Command::Delete { id } => {
        self.store.delete_property(&PropertyId::new(id)).await?;
        Ok(())
      }
      Command::Analytics => self.analytics().await,
      Command::History { command } => self.history(command),
    }
  }

  async fn login(&self, email: &str) -> Result<()> {
    let password = Config::get_password()?;
    let response = self.client.login(email, &password).await?;
    if response.access.is_none() {
      return Err(eyre!("Login failed. Please try again."));
    }
    self.session.leave_guest_mode();

    match self.session.current_user() {
      Some(user) => println!("Signed in as {} ({:?})", user.name, user.role),
      None => println!("Signed in"),
    }
    Ok(())
  }

  async fn list(&self, args: &ListArgs) -> Result<()> {
    if let Some(query) = args.search_query() {
      self.history.add_to_search_history(query)?;
    }

    let result = self.store.fetch_properties(&args.filters(), args.refresh).await?;
    let page = &result.data;

    for property in &page.properties {
      print_row(property);
    }

    let source = if result.is_cached() { " (cached)" } else { "" };
    match (page.current_page, page.total_pages) {
      (Some(current), Some(total)) => println!(
        "-- page {} of {}, {} properties{}",
        current, total, page.total_elements, source
      ),
      _ => println!("-- {} properties{}", page.total_elements, source),
    }
    Ok(())
  }

  async fn show(&self, id: &PropertyId) -> Result<()> {
    let property = self
      .store
      .get_property_by_id(id)
      .await
      .ok_or_else(|| eyre!("Property {} could not be loaded", id))?;

    self.history.add_to_recent_visits(&property)?;

    println!("{}", property.title);
    println!("  id:           {}", property.id);
    println!("  type:         {} {}", property.property_type, property.category);
    println!("  where:        {}", location(&property));
    println!("  price:        {}", price(&property));
    println!("  availability: {}", property.availability.label());
    if !property.amenities.is_empty() {
      let amenities: Vec<&str> = property.amenities.iter().map(String::as_str).collect();
      println!("  amenities:    {}", amenities.join(", "));
    }
    if !property.image_ids.is_empty() {
      println!("  images:       {}", property.image_ids.len());
    }
    if !property.description.is_empty() {
      println!();
      println!("{}", property.description);
    }

    if self.store.favorite_status(id).await? {
      println!("  * in your favorites");
    }
    Ok(())
  }

  async fn favorites(&self) -> Result<()> {
    self.store.fetch_favorites().await?;
    let state = self.store.snapshot();
    if state.favorites.is_empty() {
      println!("No favorites");
    }
    for favorite in &state.favorites {
      match &favorite.property {
        Some(property) => print_row(property),
        None => println!("{}", favorite.property_id),
      }
    }
    Ok(())
  }

  async fn analytics(&self) -> Result<()> {
    let analytics = self.store.fetch_provider_analytics().await?;
    println!(
      "{} properties ({} active)",
      analytics.total_properties, analytics.active_properties
    );
    println!(
      "{} views, {} unique viewers, {} favorites",
      analytics.total_views, analytics.unique_viewers, analytics.total_favorites
    );
    println!(
      "this week: {} views, {} favorites",
      analytics.views_this_week, analytics.favorites_this_week
    );
    for top in &analytics.top_performing_properties {
      println!("  {:<30} {:>6} views", top.title, top.total_views);
    }
    Ok(())
  }

  fn history(&self, command: HistoryCommand) -> Result<()> {
    match command {
      HistoryCommand::Visits { limit } => {
        for visit in self.history.get_recent_visits(limit)? {
          println!(
            "{}  {}",
            visit.visited_at.format("%Y-%m-%d %H:%M"),
            visit.property.title
          );
        }
      }
      HistoryCommand::Searches { limit } => {
        for entry in self.history.get_search_history(limit)? {
          println!("{}  {}", entry.searched_at.format("%Y-%m-%d %H:%M"), entry.query);
        }
      }
      HistoryCommand::Clear => {
        self.history.clear_recent_visits()?;
        self.history.clear_search_history()?;
        println!("History cleared");
      }
    }
    Ok(())
  }
}

fn print_row(property: &Property) {
  println!(
    "{:<18} {:<32} {:<14} {:>16}  {}",
    property.id.as_str(),
    truncate(&property.title, 32),
    truncate(&property.city, 14),
    price(property),
    property.availability.label()
  );
}

fn truncate(text: &str, width: usize) -> String {
  if text.chars().count() <= width {
    return text.to_string();
  }
  let cut: String = text.chars().take(width.saturating_sub(1)).collect();
  format!("{}…", cut)
}

fn price(property: &Property) -> String {
  match (property.minimum_price, property.maximum_price) {
    (Some(min), Some(max)) if max > min => format!("{:.0}-{:.0}", min, max),
    (Some(min), _) => format!("{:.0}", min),
    (None, Some(max)) => format!("up to {:.0}", max),
    (None, None) => "-".to_string(),
  }
}

fn location(property: &Property) -> String {
  [
    property.location.as_str(),
    property.city.as_str(),
    property.state.as_str(),
    property.country.as_str(),
  ]
  .into_iter()
  .filter(|part| !part.is_empty())
  .collect::<Vec<_>>()
  .join(", ")
}
