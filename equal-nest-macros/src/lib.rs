//! Procedural macros for equal-nest
//!
//! - `equal_nest!` - Name the relationship operations after the relation

use convert_case::{Case, Casing};
use proc_macro::TokenStream;
use proc_macro2::Span;
use quote::quote;
use syn::{parse::Parse, parse::ParseStream, parse_macro_input, Ident, Path, Token};

/// Generate relation-named traits over the relationship manager and query.
///
/// # Usage
///
/// ```ignore
/// equal_nest!(Person, friend);
/// ```
///
/// # Generated Code
///
/// For `equal_nest!(Person, friend)`:
///
/// ```ignore
/// pub trait FriendNest {
///     async fn has_friend(&self, person: InstanceId, friend: InstanceId) -> Result<bool>;
///     fn add_friend(&mut self, person: InstanceId, friend: InstanceId) -> Result<()>;
///     fn remove_friend(&mut self, person: InstanceId, friend: InstanceId) -> Result<()>;
///     async fn get_friends(&mut self, person: InstanceId) -> Result<Vec<InstanceId>>;
///     async fn set_friends<I>(&mut self, person: InstanceId, friends: I) -> Result<()>;
///     fn add_friends<I>(&mut self, person: InstanceId, friends: I) -> Result<()>;
///     async fn remove_friends(&mut self, person: InstanceId, friends: Option<&[InstanceId]>) -> Result<()>;
///     async fn count_friends(&self, person: InstanceId) -> Result<usize>;
/// }
/// impl FriendNest for RelationshipManager<Person> { ... }
///
/// pub trait FriendNestQuery {
///     async fn count_friends_of(&self, person: &Person) -> Result<i64>;
///     async fn find_friends_of(&self, person: &Person) -> Result<Vec<Person>>;
/// }
/// impl FriendNestQuery for NestQuery<'_, Person> { ... }
/// ```
#[proc_macro]
pub fn equal_nest(input: TokenStream) -> TokenStream {
    let parsed = parse_macro_input!(input as EqualNestInput);

    let entity = &parsed.entity;
    let names = RelationNames::new(&parsed.entity_name(), &parsed.relation.to_string());

    let ident = |name: &str| Ident::new(name, Span::call_site());
    let nest_trait = ident(&format!("{}Nest", names.pascal));
    let query_trait = ident(&format!("{}NestQuery", names.pascal));
    let owner = ident(&names.owner);
    let other = ident(&names.other);
    let others = ident(&names.plural);

    let has = ident(&format!("has_{}", names.singular));
    let add = ident(&format!("add_{}", names.singular));
    let remove = ident(&format!("remove_{}", names.singular));
    let get_all = ident(&format!("get_{}", names.plural));
    let set_all = ident(&format!("set_{}", names.plural));
    let add_all = ident(&format!("add_{}", names.plural));
    let remove_all = ident(&format!("remove_{}", names.plural));
    let count_all = ident(&format!("count_{}", names.plural));
    let count_of = ident(&format!("count_{}_of", names.plural));
    let find_of = ident(&format!("find_{}_of", names.plural));

    let output = quote! {
        #[allow(async_fn_in_trait)]
        pub trait #nest_trait {
            async fn #has(
                &self,
                #owner: ::equal_nest::InstanceId,
                #other: ::equal_nest::InstanceId,
            ) -> ::equal_nest::Result<bool>;

            fn #add(
                &mut self,
                #owner: ::equal_nest::InstanceId,
                #other: ::equal_nest::InstanceId,
            ) -> ::equal_nest::Result<()>;

            fn #remove(
                &mut self,
                #owner: ::equal_nest::InstanceId,
                #other: ::equal_nest::InstanceId,
            ) -> ::equal_nest::Result<()>;

            async fn #get_all(
                &mut self,
                #owner: ::equal_nest::InstanceId,
            ) -> ::equal_nest::Result<Vec<::equal_nest::InstanceId>>;

            async fn #set_all<I>(&mut self, #owner: ::equal_nest::InstanceId, #others: I) -> ::equal_nest::Result<()>
            where
                I: IntoIterator,
                I::Item: ::std::borrow::Borrow<::equal_nest::InstanceId>;

            fn #add_all<I>(&mut self, #owner: ::equal_nest::InstanceId, #others: I) -> ::equal_nest::Result<()>
            where
                I: IntoIterator,
                I::Item: ::std::borrow::Borrow<::equal_nest::InstanceId>;

            /// `None` removes every member.
            async fn #remove_all(
                &mut self,
                #owner: ::equal_nest::InstanceId,
                #others: Option<&[::equal_nest::InstanceId]>,
            ) -> ::equal_nest::Result<()>;

            async fn #count_all(&self, #owner: ::equal_nest::InstanceId) -> ::equal_nest::Result<usize>;
        }

        impl #nest_trait for ::equal_nest::RelationshipManager<#entity> {
            async fn #has(
                &self,
                #owner: ::equal_nest::InstanceId,
                #other: ::equal_nest::InstanceId,
            ) -> ::equal_nest::Result<bool> {
                self.has_related(#owner, #other).await
            }

            fn #add(
                &mut self,
                #owner: ::equal_nest::InstanceId,
                #other: ::equal_nest::InstanceId,
            ) -> ::equal_nest::Result<()> {
                self.add_related(#owner, #other)
            }

            fn #remove(
                &mut self,
                #owner: ::equal_nest::InstanceId,
                #other: ::equal_nest::InstanceId,
            ) -> ::equal_nest::Result<()> {
                self.remove_related(#owner, #other)
            }

            async fn #get_all(
                &mut self,
                #owner: ::equal_nest::InstanceId,
            ) -> ::equal_nest::Result<Vec<::equal_nest::InstanceId>> {
                self.related(#owner).await
            }

            async fn #set_all<I>(&mut self, #owner: ::equal_nest::InstanceId, #others: I) -> ::equal_nest::Result<()>
            where
                I: IntoIterator,
                I::Item: ::std::borrow::Borrow<::equal_nest::InstanceId>,
            {
                self.set_related(#owner, #others).await
            }

            fn #add_all<I>(&mut self, #owner: ::equal_nest::InstanceId, #others: I) -> ::equal_nest::Result<()>
            where
                I: IntoIterator,
                I::Item: ::std::borrow::Borrow<::equal_nest::InstanceId>,
            {
                self.add_many(#owner, #others)
            }

            async fn #remove_all(
                &mut self,
                #owner: ::equal_nest::InstanceId,
                #others: Option<&[::equal_nest::InstanceId]>,
            ) -> ::equal_nest::Result<()> {
                match #others {
                    Some(#others) => self.remove_many(#owner, #others),
                    None => self.clear_related(#owner).await,
                }
            }

            async fn #count_all(&self, #owner: ::equal_nest::InstanceId) -> ::equal_nest::Result<usize> {
                self.count_related(#owner).await
            }
        }

        #[allow(async_fn_in_trait)]
        pub trait #query_trait {
            async fn #count_of(&self, #owner: &#entity) -> ::equal_nest::Result<i64>;

            async fn #find_of(&self, #owner: &#entity) -> ::equal_nest::Result<Vec<#entity>>;
        }

        impl #query_trait for ::equal_nest::NestQuery<'_, #entity> {
            async fn #count_of(&self, #owner: &#entity) -> ::equal_nest::Result<i64> {
                self.count_related_of(#owner).await
            }

            async fn #find_of(&self, #owner: &#entity) -> ::equal_nest::Result<Vec<#entity>> {
                self.find_related_of(#owner).await
            }
        }
    };
    output.into()
}

/// Input for equal_nest! macro
struct EqualNestInput {
    entity: Path,
    relation: Ident,
}

impl EqualNestInput {
    fn entity_name(&self) -> String {
        self.entity
            .segments
            .last()
            .map(|s| s.ident.to_string())
            .unwrap_or_default()
    }
}

impl Parse for EqualNestInput {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let entity: Path = input.parse()?;
        input.parse::<Token![,]>()?;
        let relation: Ident = input.parse()?;

        if input.peek(Token![,]) {
            input.parse::<Token![,]>()?;
        }

        Ok(EqualNestInput { entity, relation })
    }
}

/// Identifier fragments derived from the entity and relation names
#[derive(Debug, PartialEq)]
struct RelationNames {
    pascal: String,
    singular: String,
    plural: String,
    owner: String,
    other: String,
}

impl RelationNames {
    fn new(entity: &str, relation: &str) -> Self {
        let singular = relation.to_case(Case::Snake);
        let owner = entity.to_case(Case::Snake);
        let other = if owner == singular {
            format!("other_{}", singular)
        } else {
            singular.clone()
        };

        Self {
            pascal: relation.to_case(Case::Pascal),
            plural: pluralize(&singular),
            singular,
            owner,
            other,
        }
    }
}

fn pluralize(word: &str) -> String {
    if ["s", "x", "ch", "sh"].iter().any(|suffix| word.ends_with(suffix)) {
        format!("{}es", word)
    } else {
        format!("{}s", word)
    }
}
