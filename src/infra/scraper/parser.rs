use crate::domain::catalog::Book;
use anyhow::anyhow;
use scraper::{ElementRef, Html, Selector};
use url::Url;

/// Category assigned to every book on a page, by page number.
const CATEGORY_ROTATION: [&str; 10] = [
    "Fiction",
    "Non-Fiction",
    "Mystery",
    "Romance",
    "Science Fiction",
    "Fantasy",
    "Biography",
    "History",
    "Travel",
    "Cooking",
];

const RATING_WORDS: [&str; 5] = ["One", "Two", "Three", "Four", "Five"];
const DEFAULT_AVAILABILITY: &str = "In stock";

pub fn category_for_page(page: usize) -> &'static str {
    CATEGORY_ROTATION[page % CATEGORY_ROTATION.len()]
}

/// A book as read off a listing page, before it is assigned an id.
#[derive(Debug, Clone, PartialEq)]
pub struct ScrapedBook {
    pub title: String,
    pub price: f64,
    pub rating: u8,
    pub availability: String,
    pub category: String,
    pub image_url: String,
    pub book_url: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub books: Vec<ScrapedBook>,
    /// Absolute URL of the next listing page, when the page links one.
    pub next_page: Option<String>,
}

/// Numbers records sequentially from 1, in crawl order.
pub fn into_books(scraped: Vec<ScrapedBook>) -> Vec<Book> {
    scraped
        .into_iter()
        .enumerate()
        .map(|(i, s)| Book {
            id: i as i64 + 1,
            title: s.title,
            price: s.price,
            rating: s.rating,
            availability: s.availability,
            category: s.category,
            image_url: s.image_url,
            book_url: s.book_url,
        })
        .collect()
}

/// Pre-compiled selectors for the catalog listing layout.
pub struct ListingParser {
    product: Selector,
    title_link: Selector,
    price: Selector,
    rating: Selector,
    availability: Selector,
    image: Selector,
    next: Selector,
}

fn selector(css: &str) -> anyhow::Result<Selector> {
    Selector::parse(css).map_err(|e| anyhow!("invalid selector {css:?}: {e}"))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_price(text: &str) -> f64 {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    cleaned.parse().unwrap_or(0.0)
}

fn rating_from_classes<'a>(classes: impl Iterator<Item = &'a str>) -> u8 {
    classes
        .filter_map(|class| RATING_WORDS.iter().position(|w| *w == class))
        .map(|i| i as u8 + 1)
        .next()
        .unwrap_or(0)
}

fn resolve(base: &Url, href: Option<&str>) -> String {
    href.and_then(|h| base.join(h).ok())
        .map(String::from)
        .unwrap_or_default()
}

impl ListingParser {
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self {
            product: selector("article.product_pod")?,
            title_link: selector("h3 a")?,
            price: selector("p.price_color")?,
            rating: selector("p.star-rating")?,
            availability: selector("p.availability")?,
            image: selector("div.image_container img")?,
            next: selector("li.next a")?,
        })
    }

    /// Extracts every product on a listing page. Relative links resolve against `page_url`.
    pub fn parse(&self, html: &str, page_url: &Url, page: usize) -> ListingPage {
        let document = Html::parse_document(html);
        let books = document
            .select(&self.product)
            .enumerate()
            .map(|(i, product)| self.parse_product(product, page_url, page, i))
            .collect();
        let next_page = document
            .select(&self.next)
            .next()
            .and_then(|a| a.value().attr("href"))
            .and_then(|href| page_url.join(href).ok())
            .map(String::from);

        ListingPage { books, next_page }
    }

    fn parse_product(&self, product: ElementRef<'_>, page_url: &Url, page: usize, index: usize) -> ScrapedBook {
        let link = product.select(&self.title_link).next();
        let title = link
            .and_then(|a| {
                a.value()
                    .attr("title")
                    .map(str::to_string)
                    .or_else(|| Some(collapse_whitespace(&a.text().collect::<String>())))
            })
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| format!("Book {} - Page {}", index + 1, page));

        let price = product
            .select(&self.price)
            .next()
            .map(|p| parse_price(&p.text().collect::<String>()))
            .unwrap_or(0.0);

        let rating = product
            .select(&self.rating)
            .next()
            .map(|p| rating_from_classes(p.value().classes()))
            .unwrap_or(0);

        let availability = product
            .select(&self.availability)
            .next()
            .map(|p| collapse_whitespace(&p.text().collect::<String>()))
            .filter(|a| !a.is_empty())
            .unwrap_or_else(|| DEFAULT_AVAILABILITY.to_string());

        let image_url = resolve(
            page_url,
            product
                .select(&self.image)
                .next()
                .and_then(|img| img.value().attr("src")),
        );
        let book_url = resolve(page_url, link.and_then(|a| a.value().attr("href")));

        ScrapedBook {
            title,
            price,
            rating,
            availability,
            category: category_for_page(page).to_string(),
            image_url,
            book_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LISTING: &str = r#"
        <html><body><ol class="row">
          <li><article class="product_pod">
            <div class="image_container">
              <a href="a-light-in-the-attic_1000/index.html">
                <img src="../media/cache/2c/da/2cdad67c.jpg" alt="A Light in the Attic">
              </a>
            </div>
            <p class="star-rating Three"></p>
            <h3><a href="a-light-in-the-attic_1000/index.html" title="A Light in the Attic">A Light in the ...</a></h3>
            <div class="product_price">
              <p class="price_color">£51.77</p>
              <p class="instock availability">
                <i class="icon-ok"></i>
                  In stock
              </p>
            </div>
          </article></li>
          <li><article class="product_pod">
            <p class="star-rating"></p>
            <h3><a href="soumission_998/index.html">Soumission</a></h3>
            <p class="price_color">Â£50.10</p>
          </article></li>
          <li><article class="product_pod">
            <p class="price_color">€12</p>
          </article></li>
        </ol>
        <ul class="pager"><li class="next"><a href="page-3.html">next</a></li></ul>
        </body></html>
    "#;

    fn parse(page: usize) -> ListingPage {
        let url = Url::parse("https://books.example/catalogue/page-2.html").unwrap();
        ListingParser::new().unwrap().parse(LISTING, &url, page)
    }

    #[test]
    fn extracts_products_and_resolves_links() {
        let listing = parse(2);
        assert_eq!(listing.books.len(), 3);

        let first = &listing.books[0];
        assert_eq!(first.title, "A Light in the Attic");
        assert_eq!(first.price, 51.77);
        assert_eq!(first.rating, 3);
        assert_eq!(first.availability, "In stock");
        assert_eq!(first.category, "Mystery");
        assert_eq!(
            first.book_url,
            "https://books.example/catalogue/a-light-in-the-attic_1000/index.html"
        );
        assert_eq!(
            first.image_url,
            "https://books.example/media/cache/2c/da/2cdad67c.jpg"
        );
        assert_eq!(
            listing.next_page.as_deref(),
            Some("https://books.example/catalogue/page-3.html")
        );
    }

    #[test]
    fn missing_fields_take_fallbacks() {
        let listing = parse(2);

        let second = &listing.books[1];
        assert_eq!(second.title, "Soumission");
        assert_eq!(second.price, 50.10);
        assert_eq!(second.rating, 0);
        assert_eq!(second.availability, "In stock");
        assert_eq!(second.image_url, "");

        let third = &listing.books[2];
        assert_eq!(third.title, "Book 3 - Page 2");
        assert_eq!(third.price, 12.0);
        assert_eq!(third.book_url, "");
    }

    #[test]
    fn last_page_has_no_next_link() {
        let url = Url::parse("https://books.example/index.html").unwrap();
        let listing = ListingParser::new()
            .unwrap()
            .parse("<html><body></body></html>", &url, 1);
        assert!(listing.books.is_empty());
        assert!(listing.next_page.is_none());
    }

    #[test]
    fn categories_rotate_by_page() {
        assert_eq!(category_for_page(1), "Non-Fiction");
        assert_eq!(category_for_page(10), "Fiction");
        assert_eq!(category_for_page(19), "Cooking");
    }

    #[test]
    fn ids_are_assigned_in_order() {
        let books = into_books(parse(1).books);
        let ids: Vec<i64> = books.iter().map(|b| b.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(books[0].category, "Non-Fiction");
    }
}
