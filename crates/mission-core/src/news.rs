//! News feed shown next to the bar mission list.
//!
//! The news script defines `news(n)` returning a headline string and a list
//! of `{ title = ..., desc = ... }` articles. The headline becomes the first
//! article of the feed.

use std::rc::Rc;

use mlua::{Function, Lua, Table};
use serde::{Deserialize, Serialize};

use crate::error::ScriptError;
use crate::lua::api;
use crate::universe::Universe;

pub const HEADLINE_TITLE: &str = "NEWS HEADLINES";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub title: String,
    pub desc: String,
}

pub struct NewsFeed {
    lua: Lua,
}

impl NewsFeed {
    pub fn new(source: &str, universe: &Rc<Universe>) -> Result<Self, ScriptError> {
        let load_err = |e: mlua::Error| ScriptError::Load {
            script: "news".into(),
            message: e.to_string(),
        };
        let lua = Lua::new();
        api::register_refs(&lua, universe).map_err(load_err)?;
        lua.load(source).set_name("news").exec().map_err(load_err)?;
        Ok(Self { lua })
    }

    /// Ask the script for up to `n` articles.
    pub fn generate(&self, n: usize) -> Result<Vec<Article>, ScriptError> {
        let runtime = |e: mlua::Error| ScriptError::Runtime {
            entry: "news".into(),
            message: e.to_string(),
        };
        let news: Function = self
            .lua
            .globals()
            .get("news")
            .map_err(|_| ScriptError::MissingEntry {
                entry: "news".into(),
            })?;
        let (headline, list): (String, Table) = news.call(n).map_err(runtime)?;

        let mut articles = vec![Article {
            title: HEADLINE_TITLE.to_string(),
            desc: headline,
        }];
        for entry in list.sequence_values::<Table>() {
            let entry = entry.map_err(runtime)?;
            articles.push(Article {
                title: entry.get("title").map_err(runtime)?,
                desc: entry.get("desc").map_err(runtime)?,
            });
            if articles.len() > n {
                break;
            }
        }
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCRIPT: &str = r#"
        function news(n)
            local list = {}
            for i = 1, 5 do
                list[i] = { title = "Story " .. i, desc = "Body " .. i }
            end
            return "Empire celebrates", list
        end
    "#;

    #[test]
    fn headline_comes_first() {
        let feed = NewsFeed::new(SCRIPT, &Rc::new(Universe::default())).unwrap();
        let articles = feed.generate(2).unwrap();
        assert_eq!(articles.len(), 3);
        assert_eq!(articles[0].title, HEADLINE_TITLE);
        assert_eq!(articles[0].desc, "Empire celebrates");
        assert_eq!(articles[2].title, "Story 2");
    }

    #[test]
    fn bad_return_is_an_error() {
        let feed = NewsFeed::new("function news(n) return 1 end", &Rc::new(Universe::default()))
            .unwrap();
        assert!(feed.generate(3).is_err());
        let empty = NewsFeed::new("", &Rc::new(Universe::default())).unwrap();
        assert!(matches!(empty.generate(3), Err(ScriptError::MissingEntry { .. })));
    }
}
