//! Command-line subcommands and their translation into store calls.

use clap::{Args, Subcommand};

use haven::cache::{PropertyFilters, DEFAULT_PAGE_SIZE};
use haven::models::ListingKind;

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Sign in. The password is read from HAVEN_PASSWORD
  Login { email: String },
  /// Sign out and forget stored tokens
  Logout,
  /// Browse without an account
  Guest,
  /// Change your name or email
  Profile {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
  },
  /// List or search properties
  List(ListArgs),
  /// Show one property and record the visit
  Show { id: String },
  /// List your favorites
  Favorites,
  /// Add a property to favorites
  Favorite { id: String },
  /// Remove a property from favorites
  Unfavorite { id: String },
  /// Change a listing's availability (Available, Occupied, Maintenance, Coming_Soon)
  Status { id: String, status: String },
  /// Delete one of your listings
  Delete { id: String },
  /// Provider dashboard numbers
  Analytics,
  /// Recently visited properties and past searches
  History {
    #[command(subcommand)]
    command: HistoryCommand,
  },
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
  Visits {
    #[arg(long)]
    limit: Option<usize>,
  },
  Searches {
    #[arg(long)]
    limit: Option<usize>,
  },
  /// Forget both visits and searches
  Clear,
}

#[derive(Args, Debug, Default)]
pub struct ListArgs {
  #[arg(long, default_value_t = 1)]
  pub page: u32,
  #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
  pub size: u32,
  #[arg(long)]
  pub search: Option<String>,
  #[arg(long)]
  pub city: Option<String>,
  #[arg(long = "type")]
  pub property_type: Option<String>,
  /// rent or sale
  #[arg(long)]
  pub listing: Option<ListingKind>,
  #[arg(long)]
  pub min_price: Option<f64>,
  #[arg(long)]
  pub max_price: Option<f64>,
  /// Repeat for several amenities
  #[arg(long = "amenity")]
  pub amenities: Vec<String>,
  /// Skip the cache
  #[arg(long)]
  pub refresh: bool,
}

impl ListArgs {
  pub fn filters(&self) -> PropertyFilters {
    PropertyFilters {
      page: Some(self.page),
      size: Some(self.size),
      search: self.search.clone(),
      city: self.city.clone(),
      property_type: self.property_type.clone(),
      listing_type: self.listing,
      min_price: self.min_price,
      max_price: self.max_price,
      amenities: self.amenities.iter().cloned().collect(),
      ..Default::default()
    }
  }

  /// Search text worth remembering, if any.
  pub fn search_query(&self) -> Option<&str> {
    self
      .search
      .as_deref()
      .map(str::trim)
      .filter(|s| !s.is_empty())
  }
}
